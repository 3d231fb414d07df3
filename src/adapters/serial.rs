//! Serial transport for RS-232 connected instruments.
//!
//! Wraps the `serialport` crate and provides async I/O using Tokio's
//! blocking task executor for the synchronous serial operations.

use super::Transport;
use crate::config::InstrumentSettings;
use crate::error::{AppResult, PicologError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::Arc;
use tokio::sync::Mutex;

/// RS-232 byte stream behind `Arc<Mutex>` for async access.
pub struct SerialTransport {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
}

impl SerialTransport {
    /// Open the configured port.
    ///
    /// Failure here is fatal to the run: there is nothing to acquire from.
    /// The read timeout set on the port bounds each `read_chunk` window.
    pub fn open(settings: &InstrumentSettings) -> AppResult<Self> {
        let port = serialport::new(&settings.port, settings.baud_rate)
            .timeout(settings.read_timeout())
            .open()
            .map_err(|e| PicologError::PortUnavailable {
                port: settings.port.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            "Serial port '{}' opened at {} baud",
            settings.port, settings.baud_rate
        );
        Ok(Self {
            port: Arc::new(Mutex::new(port)),
        })
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write(&mut self, bytes: Vec<u8>) -> Result<()> {
        let port = self.port.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut guard = port.blocking_lock();
            guard
                .write_all(&bytes)
                .context("Failed to write to serial port")?;
            guard.flush().context("Failed to flush serial port")?;
            Ok(())
        })
        .await
        .context("Serial I/O task panicked")?
    }

    async fn read_chunk(&mut self, buffer: &mut Vec<u8>) -> Result<usize> {
        let port = self.port.clone();
        let (chunk, n) = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, usize)> {
            let mut temp = vec![0u8; 1024];
            let n = match port.blocking_lock().read(&mut temp) {
                Ok(n) => n,
                // An empty window is a normal outcome, not an error.
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => 0,
                Err(e) => return Err(e).context("Serial read failed"),
            };
            Ok((temp, n))
        })
        .await
        .context("Serial I/O task panicked")??;

        buffer.clear();
        buffer.extend_from_slice(&chunk[..n]);
        Ok(n)
    }
}
