//! Measurement data types shared across the acquisition pipeline.

/// A single accepted reading.
///
/// Immutable once recorded; the acquisition loop appends these to an ordered,
/// strictly time-increasing sequence for the lifetime of the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the run started.
    pub elapsed_seconds: f64,
    /// Measured current in amps, sign multiplier already applied.
    pub current_amps: f64,
}

/// Record forwarded to the display sink after every accepted sample.
#[derive(Debug, Clone, Copy)]
pub struct DisplayUpdate {
    /// Seconds since the run started.
    pub elapsed_seconds: f64,
    /// The reading that produced this update, in amps.
    pub current_amps: f64,
    /// Mean over all accepted samples so far.
    pub mean: f64,
    /// RMS deviation from the mean as a percentage of the mean. Non-finite
    /// when the mean sits at or near zero.
    pub rms_percent: f64,
    /// Number of accepted samples so far.
    pub sample_count: usize,
}
