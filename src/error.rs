//! Custom error types for the application.
//!
//! This module defines the primary error type, `PicologError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the conditions the logger can run into, and keeps
//! the fatal/transient split explicit:
//!
//! - **`PortUnavailable`** is the only fatal runtime condition: the serial
//!   port could not be opened at startup, so there is nothing to log from.
//! - **`Timeout`**, **`Malformed`** and **`Transport`** are transient: the
//!   acquisition loop discards the affected cycle and tries again on the
//!   next one, with no retry limit and no backoff.
//! - **`Config`**/**`Configuration`** cover file parsing and semantic
//!   validation of the settings before a run starts.
//! - **`Storage`** wraps session-file creation and write failures.
//!
//! Out-of-range readings are not an error at all; the loop drops them
//! silently before they reach persistence or statistics.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, PicologError>;

/// Central error taxonomy for the logger.
#[derive(Error, Debug)]
pub enum PicologError {
    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The serial port could not be opened. Access-denied here usually means
    /// the port is still held by another process; re-plugging the USB-serial
    /// adaptor tends to clear it.
    #[error("Serial port '{port}' unavailable: {reason}")]
    PortUnavailable {
        /// Port identifier as configured (e.g. "/dev/ttyUSB0", "COM3").
        port: String,
        /// OS-level cause, verbatim.
        reason: String,
    },

    /// Mid-run I/O failure on the byte stream. The current cycle's reading
    /// is abandoned and the loop continues.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// No terminated response arrived within the maximum wait.
    #[error("No terminated response within {waited:?}")]
    Timeout {
        /// How long the driver waited before giving up on the response.
        waited: Duration,
    },

    /// The response line could not be decoded into a reading. Carries the
    /// offending text for diagnostics.
    #[error("Malformed instrument response: {response:?}")]
    Malformed {
        /// The raw response text, trimmed of the trailing terminator.
        response: String,
    },

    /// Session file could not be created or appended to.
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for PicologError {
    fn from(err: anyhow::Error) -> Self {
        Self::Transport(format!("{err:#}"))
    }
}
