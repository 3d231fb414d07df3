//! Mock transport for testing without physical hardware.
//!
//! Replays a scripted sequence of read chunks, records every write, and can
//! inject a one-shot write failure. Internals are shared behind `Arc`, so a
//! clone kept by the test still sees the command log after the original has
//! been moved into a driver.

use super::Transport;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Scriptable in-memory transport.
#[derive(Clone, Default)]
pub struct MockTransport {
    chunks: Arc<Mutex<VecDeque<Vec<u8>>>>,
    written: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_next_write: Arc<AtomicBool>,
}

impl MockTransport {
    /// Create an empty transport; every read window comes back empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one read window's worth of bytes.
    pub fn push_chunk(&self, bytes: &[u8]) {
        self.chunks.lock().unwrap().push_back(bytes.to_vec());
    }

    /// Queue a whole response as a single read window.
    pub fn push_response(&self, text: &str) {
        self.push_chunk(text.as_bytes());
    }

    /// Make the next `write` fail, once.
    pub fn trigger_write_failure(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Everything written so far, lossily decoded per write call.
    pub fn written_commands(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, bytes: Vec<u8>) -> Result<()> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("Mock write failure"));
        }
        self.written.lock().unwrap().push(bytes);
        Ok(())
    }

    async fn read_chunk(&mut self, buffer: &mut Vec<u8>) -> Result<usize> {
        buffer.clear();
        if let Some(chunk) = self.chunks.lock().unwrap().pop_front() {
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_chunks_in_order() {
        let mut transport = MockTransport::new();
        transport.push_chunk(b"first");
        transport.push_chunk(b"second");

        let mut buffer = Vec::new();
        assert_eq!(transport.read_chunk(&mut buffer).await.unwrap(), 5);
        assert_eq!(buffer, b"first");
        transport.read_chunk(&mut buffer).await.unwrap();
        assert_eq!(buffer, b"second");

        // Script exhausted: empty windows from here on.
        assert_eq!(transport.read_chunk(&mut buffer).await.unwrap(), 0);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn write_failure_is_one_shot() {
        let mut transport = MockTransport::new();
        transport.trigger_write_failure();
        assert!(transport.write(b"READ?\r".to_vec()).await.is_err());
        assert!(transport.write(b"READ?\r".to_vec()).await.is_ok());
        assert_eq!(transport.written_commands(), vec!["READ?\r"]);
    }

    #[tokio::test]
    async fn clone_shares_the_script_and_log() {
        let transport = MockTransport::new();
        let mut moved = transport.clone();
        transport.push_chunk(b"data");

        let mut buffer = Vec::new();
        moved.read_chunk(&mut buffer).await.unwrap();
        assert_eq!(buffer, b"data");

        moved.write(b"*RST\r".to_vec()).await.unwrap();
        assert_eq!(transport.written_commands(), vec!["*RST\r"]);
    }
}
