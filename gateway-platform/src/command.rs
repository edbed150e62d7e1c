//! Outbound command path

use gateway_protocol::Command;
use gateway_transport::Transport;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Forwards command strings to the transport
///
/// No framing, buffering or retry happens here. Handlers build the wire text
/// with [`Command`] or pass a pre-formatted string to [`send`](Self::send).
#[derive(Clone)]
pub struct CommandSender {
    transport: Arc<dyn Transport>,
}

impl CommandSender {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Write `command` to the transport exactly as given
    ///
    /// Failures are logged and otherwise ignored.
    pub fn send(&self, command: &str) {
        debug!(%command, "Sending command");
        if let Err(e) = self.transport.write(command) {
            warn!(%command, error = %e, "Failed to send command");
        }
    }

    pub fn send_command(&self, command: &Command) {
        self.send(&command.encode());
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }
}

impl fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("connected", &self.transport.is_connected())
            .finish()
    }
}
