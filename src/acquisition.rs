//! The acquisition loop: timing, validation, persistence, statistics and
//! display fan-out.
//!
//! One logical stream of control. Each iteration captures the elapsed time,
//! asks the driver for a reading, and either records it or skips the cycle:
//! timeouts and malformed responses are expected transients, out-of-range
//! readings are dropped without note. There is no retry limit and no backoff;
//! a persistently failing instrument spins at the cadence set by the read
//! timeout and only produces log noise.

use crate::adapters::Transport;
use crate::data::session::SessionWriter;
use crate::data::stats;
use crate::error::{AppResult, PicologError};
use crate::instrument::Keithley6485;
use crate::measurement::{DisplayUpdate, Sample};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Shared stop flag: one writer (the shutdown signal), one reader (the loop,
/// once per iteration). An in-flight measurement request still completes
/// before the flag is honored.
pub type StopFlag = Arc<AtomicBool>;

/// Knobs for a single run.
pub struct RunOptions {
    /// Readings with an absolute value above this are dropped unrecorded.
    pub rejection_threshold_amps: f64,
    /// Upper bound on loop iterations. Tests use this to bound a run; a live
    /// run leaves it unset and stops on the flag alone.
    pub max_iterations: Option<u64>,
}

/// What a finished run looked like.
#[derive(Debug)]
pub struct RunSummary {
    /// The session file that was written.
    pub path: PathBuf,
    /// Number of accepted samples.
    pub sample_count: usize,
}

/// Poll the instrument until the stop flag is raised, persisting every
/// accepted sample and fanning updates out to the display sink.
///
/// The session writer is flushed and closed on every exit path; dropping the
/// driver releases the transport.
pub async fn run<T: Transport>(
    mut driver: Keithley6485<T>,
    mut writer: SessionWriter,
    options: &RunOptions,
    stop: StopFlag,
    display: Option<mpsc::Sender<DisplayUpdate>>,
) -> AppResult<RunSummary> {
    let mut samples: Vec<Sample> = Vec::new();
    let started = Instant::now();
    let mut iterations = 0u64;

    while !stop.load(Ordering::SeqCst) {
        if let Some(limit) = options.max_iterations {
            if iterations >= limit {
                break;
            }
        }
        iterations += 1;

        let elapsed_seconds = started.elapsed().as_secs_f64();
        let amps = match driver.read_measurement().await {
            Ok(amps) => amps,
            Err(PicologError::Timeout { .. }) => {
                debug!("No reading this cycle (instrument still integrating)");
                continue;
            }
            Err(PicologError::Malformed { response }) => {
                warn!("Bad data: {response:?}");
                continue;
            }
            Err(PicologError::Transport(reason)) => {
                warn!("Transport hiccup, dropping this cycle: {reason}");
                continue;
            }
            Err(e) => {
                // Unexpected failure class: close the file, keep the cause.
                let _ = writer.finish();
                return Err(e);
            }
        };

        if amps.abs() > options.rejection_threshold_amps {
            debug!("Dropped out-of-range reading: {amps:.3e} A");
            continue;
        }

        let sample = Sample {
            elapsed_seconds,
            current_amps: amps,
        };
        samples.push(sample);
        writer.append(&sample)?;
        info!("Time: {elapsed_seconds:.3} sec, Current: {amps:.3e} amps");

        // Statistics always cover the full accepted set.
        if let Some(stats) = stats::compute(&samples) {
            if let Some(sink) = &display {
                // Best effort: a slow or closed display never stalls the
                // loop or the file on disk.
                let _ = sink.try_send(DisplayUpdate {
                    elapsed_seconds,
                    current_amps: amps,
                    mean: stats.mean,
                    rms_percent: stats.rms_percent,
                    sample_count: samples.len(),
                });
            }
        }
    }

    let summary = RunSummary {
        path: writer.path().to_path_buf(),
        sample_count: samples.len(),
    };
    writer.finish()?;
    info!(
        "Run complete: {} samples in '{}'",
        summary.sample_count,
        summary.path.display()
    );
    Ok(summary)
}
