//! Byte-stream transports between the instrument driver and the hardware.
//!
//! The [`Transport`] trait is the seam the driver talks through: a writable,
//! line-oriented byte stream with a bounded read window. The serial
//! implementation talks RS-232 through the `serialport` crate; the mock
//! implementation replays scripted responses for tests.

use anyhow::Result;
use async_trait::async_trait;

#[cfg(feature = "instrument_serial")]
pub mod serial;
#[cfg(feature = "instrument_serial")]
pub use serial::SerialTransport;

pub mod mock;
pub use mock::MockTransport;

/// An unreliable line-oriented byte stream.
///
/// `read_chunk` fills `buffer` with whatever bytes arrived within the
/// transport's read window, possibly nothing or a partial line, with no
/// terminator guaranteed. Framing is the caller's job.
#[async_trait]
pub trait Transport: Send {
    /// Write raw bytes to the stream.
    async fn write(&mut self, bytes: Vec<u8>) -> Result<()>;

    /// Read whatever arrived within the read window into `buffer`,
    /// returning the byte count (zero when nothing arrived in time).
    async fn read_chunk(&mut self, buffer: &mut Vec<u8>) -> Result<usize>;
}
