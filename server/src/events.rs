//! Notifications the server emits while running.
//!
//! Events go out on an unbounded channel and are never waited on; a dropped
//! receiver just means nobody is listening.

use protocol::WireType;
use std::net::SocketAddr;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub received: u64,
    pub dropped: u64,
    pub replies_sent: u64,
    pub send_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    DatagramProcessed {
        peer: SocketAddr,
        wire_type: WireType,
        replies: usize,
    },
    Stopped {
        stats: ServerStats,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ServerEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn emit(&self, event: ServerEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
