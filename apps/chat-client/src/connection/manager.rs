//! Connection manager: owns the current link and the reconnect schedule.

use std::sync::Arc;
use std::time::Duration;

use chat_common::ClientFrame;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::ClientError;

use super::events::{ConnectionEvent, ConnectionState, EventSink, TaggedEvent};
use super::transport::Connector;

/// The live half of an attempt: where outbound frames go, and its task.
struct Link {
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

/// Owns at most one connection at a time.
///
/// Every attempt gets a fresh generation number. Events from older
/// generations are discarded, so a superseded link can never flip the state
/// of the current one.
pub struct ConnectionManager {
    url: String,
    reconnect_delay: Duration,
    connector: Arc<dyn Connector>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    state: ConnectionState,
    generation: u64,
    link: Option<Link>,
    reconnect_at: Option<Instant>,
}

impl ConnectionManager {
    /// Create a manager and the receiver its connection events arrive on.
    pub fn new(
        url: impl Into<String>,
        reconnect_delay: Duration,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::UnboundedReceiver<TaggedEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            url: url.into(),
            reconnect_delay,
            connector,
            events_tx,
            state: ConnectionState::Closed,
            generation: 0,
            link: None,
            reconnect_at: None,
        };
        (manager, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the pending reconnect attempt is due, if one is scheduled.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Start a new connection attempt.
    ///
    /// No-op (returns `false`) while a connection is already open or
    /// connecting.
    pub fn connect(&mut self) -> bool {
        if self.state != ConnectionState::Closed {
            tracing::debug!(state = ?self.state, "connect ignored, connection already live");
            return false;
        }

        self.reconnect_at = None;
        self.generation += 1;
        self.state = ConnectionState::Connecting;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(self.generation, self.events_tx.clone());
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();

        tracing::info!(%url, generation = self.generation, "connecting");

        let task = tokio::spawn(async move {
            connector.run(url, outbound_rx, sink.clone()).await;
            // A connector that returns without reporting still ended the link.
            sink.emit(ConnectionEvent::Closed { reason: None });
        });

        self.link = Some(Link {
            outbound: outbound_tx,
            task,
        });
        true
    }

    /// Fire the scheduled reconnect. Called by the client loop once
    /// [`reconnect_deadline`](Self::reconnect_deadline) has passed.
    pub fn reconnect_due(&mut self) {
        if self.reconnect_at.take().is_some() {
            tracing::info!(generation = self.generation + 1, "reconnecting");
            self.connect();
        }
    }

    /// Apply an event to the state machine.
    ///
    /// Returns the event when it is current and meaningful to the caller;
    /// stale or duplicate events yield `None`.
    pub fn handle_event(&mut self, tagged: TaggedEvent) -> Option<ConnectionEvent> {
        if tagged.generation != self.generation {
            tracing::trace!(
                stale = tagged.generation,
                current = self.generation,
                "dropping event from superseded connection"
            );
            return None;
        }

        match &tagged.event {
            ConnectionEvent::Opened => {
                if self.state != ConnectionState::Connecting {
                    return None;
                }
                self.state = ConnectionState::Open;
                tracing::info!(url = %self.url, generation = self.generation, "connected");
            }
            ConnectionEvent::Frame(_) => {
                if self.state != ConnectionState::Open {
                    return None;
                }
            }
            ConnectionEvent::Closed { reason } => {
                if self.state == ConnectionState::Closed {
                    return None;
                }
                tracing::info!(reason = ?reason, generation = self.generation, "connection closed");
                self.on_lost();
            }
            ConnectionEvent::Failed(err) => {
                if self.state == ConnectionState::Closed {
                    return None;
                }
                tracing::warn!(%err, generation = self.generation, "connection failed");
                self.on_lost();
            }
        }

        Some(tagged.event)
    }

    /// Close the current link as if it had been lost. A reconnect is still
    /// scheduled. Returns the synthesized loss event, or `None` when there
    /// was nothing to close.
    pub fn disconnect(&mut self) -> Option<ConnectionEvent> {
        if self.state == ConnectionState::Closed {
            return None;
        }
        tracing::info!(generation = self.generation, "closing connection");
        self.on_lost();
        Some(ConnectionEvent::Closed {
            reason: Some("closed by client".to_string()),
        })
    }

    /// Tear down for good: no reconnect is scheduled afterwards.
    pub fn shutdown(&mut self) {
        self.reconnect_at = None;
        self.state = ConnectionState::Closed;
        // Dropping the sender lets the connector close the link gracefully.
        self.link = None;
    }

    /// Queue a frame on the open connection.
    ///
    /// Frames are silently dropped when the connection is not open; callers
    /// are expected to disable input in that state. Returns whether the frame
    /// was handed to the transport.
    pub fn send(&self, frame: &ClientFrame) -> bool {
        let link = match &self.link {
            Some(link) if self.state.can_send() => link,
            _ => {
                tracing::debug!(state = ?self.state, ?frame, "dropping frame, connection not open");
                return false;
            }
        };

        let text = match frame.to_json() {
            Ok(text) => text,
            Err(err) => {
                let err = ClientError::from(err);
                tracing::warn!(%err, "dropping frame");
                return false;
            }
        };

        link.outbound.send(text).is_ok()
    }

    fn on_lost(&mut self) {
        self.state = ConnectionState::Closed;
        if let Some(link) = self.link.take() {
            link.task.abort();
        }
        if self.reconnect_at.is_none() {
            self.reconnect_at = Some(Instant::now() + self.reconnect_delay);
            tracing::info!(delay_ms = self.reconnect_delay.as_millis() as u64, "reconnect scheduled");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
