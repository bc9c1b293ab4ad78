//! Wire-format frames exchanged with the chat server.
//!
//! Every frame is a UTF-8 JSON object carrying a `type` discriminator.
//! Frames without a recognised `type` are plain chat messages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Channel every client falls back to when its channel disappears.
pub const DEFAULT_CHANNEL: &str = "general";

/// Author name used for server notices and client-side fallbacks.
pub const SYSTEM_AUTHOR: &str = "System";

// ---------------------------------------------------------------------------
// Frame types
// ---------------------------------------------------------------------------

/// Values of the `type` discriminator.
pub struct FrameType;

impl FrameType {
    pub const USER_CONNECTED: &'static str = "user_connected";
    pub const MESSAGE: &'static str = "message";
    pub const SYSTEM_MESSAGE: &'static str = "system_message";
    pub const JOIN_CHANNEL: &'static str = "join_channel";
    pub const CREATE_CHANNEL: &'static str = "create_channel";
    pub const CHANNEL_SWITCH: &'static str = "channel_switch";
    pub const CHANNEL_CREATED: &'static str = "channel_created";
    pub const ACTIVE_CHANNELS: &'static str = "active_channels";
    pub const CHANNEL_DELETED: &'static str = "channel_deleted";
}

// ---------------------------------------------------------------------------
// Channel type
// ---------------------------------------------------------------------------

/// Retention class of a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// History lives only as long as the channel has members.
    #[default]
    Ephemeral,
    /// History is stored server-side and replayed on join.
    Persistent,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Ephemeral => "ephemeral",
            ChannelType::Persistent => "persistent",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel type `{0}` (expected `ephemeral` or `persistent`)")]
pub struct ParseChannelTypeError(pub String);

impl FromStr for ChannelType {
    type Err = ParseChannelTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ephemeral" => Ok(ChannelType::Ephemeral),
            "persistent" => Ok(ChannelType::Persistent),
            other => Err(ParseChannelTypeError(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// A frame sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Presence announcement; always the first frame on a new connection.
    UserConnected {
        username: String,
        content: String,
        channel: String,
    },
    Message {
        username: String,
        content: String,
        channel: String,
    },
    JoinChannel {
        channel: String,
    },
    CreateChannel {
        name: String,
        channel_type: ChannelType,
    },
}

impl ClientFrame {
    /// Build the presence frame announcing `username` in `channel`.
    pub fn presence(username: &str, channel: &str) -> Self {
        Self::UserConnected {
            username: username.to_string(),
            content: String::new(),
            channel: channel.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Server → Client payloads
// ---------------------------------------------------------------------------

/// `channel_switch`: the server moved this client into `channel`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelSwitchPayload {
    pub channel: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub content: String,
}

/// `channel_created`: a channel became available.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelCreatedPayload {
    pub name: String,
    #[serde(default)]
    pub channel_type: ChannelType,
}

/// `active_channels`: full listing of the channels the server knows about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActiveChannelsPayload {
    #[serde(default)]
    pub channels: Vec<SnapshotEntry>,
}

/// `channel_deleted`: the channel named in `content` is gone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelDeletedPayload {
    pub content: String,
}

/// One entry of an `active_channels` listing.
///
/// Older servers send bare names; current ones send `{name, type}` records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SnapshotEntry {
    Name(String),
    Record {
        name: String,
        #[serde(rename = "type", default)]
        channel_type: ChannelType,
    },
}

impl SnapshotEntry {
    /// Collapse both shapes into `(name, type)`. Bare names are ephemeral.
    pub fn normalize(self) -> (String, ChannelType) {
        match self {
            SnapshotEntry::Name(name) => (name, ChannelType::Ephemeral),
            SnapshotEntry::Record { name, channel_type } => (name, channel_type),
        }
    }
}

/// A chat line: user messages, server notices and replayed history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default = "default_message_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

fn default_message_type() -> String {
    FrameType::MESSAGE.to_string()
}

impl ChatMessage {
    /// A system-authored message, used when a frame cannot be understood.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            username: SYSTEM_AUTHOR.to_string(),
            content: content.into(),
            kind: FrameType::SYSTEM_MESSAGE.to_string(),
            channel: None,
            timestamp: None,
        }
    }

    /// Whether this is a regular user message (not a notice).
    pub fn is_user_message(&self) -> bool {
        self.kind == FrameType::MESSAGE
    }

    pub fn is_system(&self) -> bool {
        self.kind == FrameType::SYSTEM_MESSAGE || self.username == SYSTEM_AUTHOR
    }

    /// Server-supplied timestamp, ignoring the zero value live messages carry.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.filter(|ts| ts.year() > 1)
    }
}
