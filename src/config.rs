//! Configuration management.
//!
//! Settings are loaded from a TOML file via the `config` crate and
//! deserialized into [`Settings`]. Every key has a built-in default, so an
//! empty (or absent) file yields a usable configuration for a Keithley 6485
//! on its factory RS-232 settings: 9600 baud, 8N1, CR terminator.

use crate::error::{AppResult, PicologError};
use config::Config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Default log filter, overridable with `RUST_LOG`.
    pub log_level: String,
    /// Instrument and serial-link parameters.
    pub instrument: InstrumentSettings,
    /// Session file output parameters.
    pub storage: StorageSettings,
    /// Live console display parameters.
    pub display: DisplaySettings,
}

/// Everything the driver needs to open the link and configure the meter.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InstrumentSettings {
    /// Serial port path (e.g. "/dev/ttyUSB0", "COM3").
    pub port: String,
    /// Communication speed; the 6485 front panel default is 9600.
    pub baud_rate: u32,
    /// Command/response line terminator. Must match the TX Term setting on
    /// the instrument (factory default CR).
    pub terminator: String,
    /// Fixed measurement range in amps, sent with `CURR:RANG`.
    pub range_amps: f64,
    /// Averaging time, mapped to the NPLC parameter.
    pub averaging: Averaging,
    /// +1.0 or -1.0; set to -1.0 to flip the sign of every reading.
    pub current_sign_multiplier: f64,
    /// Readings with an absolute value above this are dropped unrecorded.
    pub rejection_threshold_amps: f64,
    /// Window for a single read call on the serial port, in milliseconds.
    pub read_timeout_ms: u64,
    /// Maximum total wait for a terminated response, in milliseconds.
    pub response_timeout_ms: u64,
}

/// Averaging time of the meter in number of power-line cycles (NPLC); larger
/// values trade speed for noise reduction.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Averaging {
    /// NPLC 0.1
    Fast,
    /// NPLC 1.0
    Medium,
    /// NPLC 6.0 (high averaging at 60 Hz)
    Slow,
}

impl Averaging {
    /// Value sent with `CURR:NPLC`.
    pub fn nplc(self) -> f64 {
        match self {
            Averaging::Fast => 0.1,
            Averaging::Medium => 1.0,
            Averaging::Slow => 6.0,
        }
    }
}

/// Where session files go.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for the numbered session files; created if missing.
    pub output_directory: PathBuf,
}

/// Console display options.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplaySettings {
    /// Print a live status line per accepted sample.
    pub enable_live_display: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            instrument: InstrumentSettings::default(),
            storage: StorageSettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            terminator: "\r".to_string(),
            range_amps: 2e-7,
            averaging: Averaging::Fast,
            current_sign_multiplier: 1.0,
            rejection_threshold_amps: 1.0,
            read_timeout_ms: 50,
            response_timeout_ms: 2000,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("timescans"),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            enable_live_display: true,
        }
    }
}

impl InstrumentSettings {
    /// Window for a single serial read call.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Maximum total wait for a terminated response.
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl Settings {
    /// Load settings from the given TOML file, or from `config/default.toml`
    /// (if present) when no path is given, then validate them.
    pub fn load(config_path: Option<&Path>) -> AppResult<Self> {
        let builder = match config_path {
            Some(path) => Config::builder().add_source(config::File::from(path)),
            None => Config::builder()
                .add_source(config::File::with_name("config/default").required(false)),
        };
        let settings: Settings = builder
            .build()
            .map_err(PicologError::Config)?
            .try_deserialize()
            .map_err(PicologError::Config)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> AppResult<()> {
        let inst = &self.instrument;
        if inst.current_sign_multiplier != 1.0 && inst.current_sign_multiplier != -1.0 {
            return Err(PicologError::Configuration(format!(
                "current_sign_multiplier must be 1.0 or -1.0, got {}",
                inst.current_sign_multiplier
            )));
        }
        if !inst.rejection_threshold_amps.is_finite() || inst.rejection_threshold_amps <= 0.0 {
            return Err(PicologError::Configuration(format!(
                "rejection_threshold_amps must be positive, got {}",
                inst.rejection_threshold_amps
            )));
        }
        if inst.terminator.len() != 1 || !inst.terminator.is_ascii() {
            return Err(PicologError::Configuration(
                "terminator must be a single ASCII character".to_string(),
            ));
        }
        if !inst.range_amps.is_finite() || inst.range_amps <= 0.0 {
            return Err(PicologError::Configuration(format!(
                "range_amps must be positive, got {}",
                inst.range_amps
            )));
        }
        if inst.response_timeout_ms == 0 {
            return Err(PicologError::Configuration(
                "response_timeout_ms must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}
