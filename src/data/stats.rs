//! Running statistics over the accepted samples.

use crate::measurement::Sample;

/// Mean and RMS deviation (as a percentage of the mean) of a sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    /// Mean current in amps.
    pub mean: f64,
    /// RMS deviation from the mean, as a percentage of the mean.
    pub rms_percent: f64,
}

/// Recompute statistics over the full accepted set.
///
/// Returns `None` for an empty set; the figures are undefined until the
/// first sample lands. The RMS figure divides by the mean, so a signal that
/// crosses zero produces a non-finite percentage; the value is propagated
/// for the consumer to render, never raised as an error.
pub fn compute(samples: &[Sample]) -> Option<Stats> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|s| s.current_amps).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|s| (s.current_amps - mean).powi(2))
        .sum::<f64>()
        / n;
    Some(Stats {
        mean,
        rms_percent: variance.sqrt() / mean * 100.0,
    })
}
