//! Instrument drivers.

pub mod keithley6485;
pub use keithley6485::Keithley6485;
