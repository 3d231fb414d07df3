//! # picolog
//!
//! Stability logger for Keithley 6485/6487 picoammeters connected over
//! RS-232 (a USB-to-serial converter works fine). The logger polls the meter
//! continuously, writes every accepted reading to a numbered session file,
//! and keeps running mean / RMS-stability figures for a live console display.
//!
//! ## Crate Structure
//!
//! - **`acquisition`**: the polling loop: timing, range rejection, fan-out
//!   to storage, statistics and the display sink, stop-flag handling.
//! - **`adapters`**: the [`adapters::Transport`] byte-stream seam, with a
//!   serial implementation and a scriptable mock for tests.
//! - **`config`**: TOML-backed [`crate::config::Settings`] with built-in
//!   defaults and validation.
//! - **`data`**: session-file allocation and writing, running statistics.
//! - **`display`**: the console sink that stands in for a live plot.
//! - **`error`**: the central [`error::PicologError`] taxonomy.
//! - **`instrument`**: the [`instrument::Keithley6485`] driver: setup
//!   sequence, response framing and decoding.

pub mod acquisition;
pub mod adapters;
pub mod config;
pub mod data;
pub mod display;
pub mod error;
pub mod instrument;
pub mod measurement;
