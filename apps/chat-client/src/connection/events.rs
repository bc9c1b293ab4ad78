//! Event-source types emitted by a connection attempt.

use tokio::sync::mpsc;

/// Lifecycle state of the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connecting,
    Open,
    #[default]
    Closed,
}

impl ConnectionState {
    pub fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// Something that happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The handshake completed; frames may now be sent.
    Opened,
    /// A text frame arrived from the server.
    Frame(String),
    /// The connection closed, remotely or locally.
    Closed { reason: Option<String> },
    /// The attempt failed or the transport errored.
    Failed(String),
}

/// An event stamped with the attempt that produced it.
#[derive(Debug, Clone)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: ConnectionEvent,
}

/// Handle a connector uses to report events for one attempt.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    /// Report an event. Returns `false` once the client has shut down.
    pub fn emit(&self, event: ConnectionEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}
