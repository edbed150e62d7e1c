//! In-memory transport that records writes, for tests

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, TransportError};
use crate::Transport;

/// Transport that stores every write instead of sending it
#[derive(Debug)]
pub struct RecordingTransport {
    written: Mutex<Vec<String>>,
    connected: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            written: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Everything written so far, in order
    pub fn written(&self) -> Vec<String> {
        self.written.lock().clone()
    }

    /// Take and clear the recorded writes
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.written.lock())
    }

    /// Simulate a connection drop (writes fail) or recovery
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RecordingTransport {
    fn write(&self, text: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.written.lock().push(text.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_writes_in_order() {
        let transport = RecordingTransport::new();
        transport.write("a*").unwrap();
        transport.write("b*").unwrap();
        assert_eq!(transport.written(), vec!["a*", "b*"]);
        assert_eq!(transport.take(), vec!["a*", "b*"]);
        assert!(transport.written().is_empty());
    }

    #[test]
    fn test_disconnected_rejects_writes() {
        let transport = RecordingTransport::new();
        transport.set_connected(false);
        assert!(matches!(transport.write("a*"), Err(TransportError::NotConnected)));
        assert!(transport.written().is_empty());
    }
}
