//! Console display sink.
//!
//! Stands in for a live plot: one status line per accepted sample, carrying
//! what a plot title would show (instantaneous reading in nanoamps, running
//! mean, RMS stability figure). Returns when the acquisition side hangs up.

use crate::measurement::DisplayUpdate;
use tokio::sync::mpsc;

/// Render updates until the channel closes.
pub async fn run_console_sink(mut updates: mpsc::Receiver<DisplayUpdate>) {
    while let Some(update) = updates.recv().await {
        println!(
            "{:10.4} nA | mean {:.3e} A | RMS {:.2} % | {} samples",
            update.current_amps * 1e9,
            update.mean,
            update.rms_percent,
            update.sample_count
        );
    }
}
