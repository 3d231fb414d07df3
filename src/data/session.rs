//! Session file management.
//!
//! Each run gets a fresh `NNN.txt` in the output directory: a fixed header
//! followed by one tab-separated line per accepted sample, time with five
//! decimal places and current in `%.5e`-style scientific notation. Lines are
//! flushed as they are written, so a run killed mid-way keeps everything
//! accepted up to that point.

use crate::error::{AppResult, PicologError};
use crate::measurement::Sample;
use csv::WriterBuilder;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Return the first unused `NNN.txt` path, scanning upward from 1.
///
/// A number freed by a deleted file is reused before anything higher, so the
/// directory fills from the bottom. Works on an empty or just-created
/// directory (returns `001.txt`).
pub fn allocate_session_path(directory: &Path) -> PathBuf {
    let mut filenum = 1u32;
    loop {
        let candidate = directory.join(format!("{filenum:03}.txt"));
        if !candidate.exists() {
            return candidate;
        }
        filenum += 1;
    }
}

/// Writer for one session's output file.
pub struct SessionWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl SessionWriter {
    /// Create the session file and write the column header.
    pub fn create(path: PathBuf) -> AppResult<Self> {
        let file = File::create(&path).map_err(|e| {
            PicologError::Storage(format!("Failed to create '{}': {}", path.display(), e))
        })?;
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
        // The doubled paren is the established file format; downstream
        // analysis scripts key on this exact header.
        writer
            .write_record(["Time(sec))", "Amps"])
            .map_err(|e| PicologError::Storage(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| PicologError::Storage(e.to_string()))?;
        info!("Logging to '{}'", path.display());
        Ok(Self { path, writer })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one sample and flush, so the line is durable before the next
    /// measurement request goes out.
    pub fn append(&mut self, sample: &Sample) -> AppResult<()> {
        self.writer
            .write_record([
                format!("{:.5}", sample.elapsed_seconds),
                scientific(sample.current_amps),
            ])
            .map_err(|e| PicologError::Storage(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| PicologError::Storage(e.to_string()))
    }

    /// Flush and release the file handle.
    pub fn finish(mut self) -> AppResult<()> {
        self.writer
            .flush()
            .map_err(|e| PicologError::Storage(e.to_string()))?;
        info!("Closed '{}'", self.path.display());
        Ok(())
    }
}

/// Format with five decimal places and a signed two-digit exponent,
/// matching the `%.5e` layout of the established file format.
fn scientific(value: f64) -> String {
    let formatted = format!("{value:.5e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn first_allocation_in_an_empty_directory_is_001() {
        let dir = tempfile::tempdir().unwrap();
        let path = allocate_session_path(dir.path());
        assert_eq!(path.file_name().unwrap(), "001.txt");
    }

    #[test]
    fn allocation_continues_past_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("001.txt"), "x").unwrap();
        fs::write(dir.path().join("002.txt"), "x").unwrap();
        let path = allocate_session_path(dir.path());
        assert_eq!(path.file_name().unwrap(), "003.txt");
    }

    #[test]
    fn allocation_reuses_a_gap() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("001.txt"), "x").unwrap();
        fs::write(dir.path().join("003.txt"), "x").unwrap();
        let path = allocate_session_path(dir.path());
        assert_eq!(path.file_name().unwrap(), "002.txt");
    }

    #[test]
    fn writes_header_and_formatted_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.txt");
        let mut writer = SessionWriter::create(path.clone()).unwrap();
        writer
            .append(&Sample {
                elapsed_seconds: 0.0,
                current_amps: 1e-9,
            })
            .unwrap();
        writer
            .append(&Sample {
                elapsed_seconds: 1.23456789,
                current_amps: -2.5e-10,
            })
            .unwrap();
        writer.finish().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Time(sec))\tAmps\n0.00000\t1.00000e-09\n1.23457\t-2.50000e-10\n"
        );
    }

    #[test]
    fn scientific_layout_matches_printf() {
        assert_eq!(scientific(1e-9), "1.00000e-09");
        assert_eq!(scientific(-2.5e-10), "-2.50000e-10");
        assert_eq!(scientific(0.0), "0.00000e+00");
        assert_eq!(scientific(1.5), "1.50000e+00");
    }
}
