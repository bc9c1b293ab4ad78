//! Per-client session state.

use chat_common::username::normalize_username;
use chat_common::ChannelType;

use crate::connection::ConnectionState;

/// Display state that survives reconnects.
#[derive(Debug, Clone)]
pub struct Session {
    username: String,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: normalize_username(&username.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Change the local username. Empty input falls back to `"User"`.
    pub fn set_username(&mut self, username: &str) {
        self.username = normalize_username(username);
    }
}

/// Read-only view of the client published after every handled event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub username: String,
    pub active_channel: String,
    pub channels: Vec<(String, ChannelType)>,
    pub connection: ConnectionState,
    pub attended: bool,
    pub unseen: u32,
}
