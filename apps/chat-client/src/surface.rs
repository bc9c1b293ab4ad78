//! Collaborator boundary: everything the core asks of the UI and platform.

use chat_common::frame::{ChannelSwitchPayload, SYSTEM_AUTHOR};
use chat_common::{ChannelType, ChatMessage};
use chrono::Local;

/// Connection status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    /// Whether message input should be enabled.
    pub fn can_send(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

/// How a display line should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Normal,
    /// Server or client generated system output.
    System,
    /// Transient notice such as "Switched to channel".
    Notice,
}

/// One rendered line of the message history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    /// `HH:MM`, absent for notices.
    pub timestamp: Option<String>,
    pub author: String,
    pub content: String,
    pub style: LineStyle,
    /// Authored by the local user.
    pub own: bool,
}

impl DisplayLine {
    pub fn from_message(msg: &ChatMessage, local_username: &str) -> Self {
        let timestamp = msg
            .sent_at()
            .map(|ts| ts.with_timezone(&Local))
            .unwrap_or_else(Local::now)
            .format("%H:%M")
            .to_string();

        Self {
            timestamp: Some(timestamp),
            author: msg.username.clone(),
            content: msg.content.clone(),
            style: if msg.is_system() {
                LineStyle::System
            } else {
                LineStyle::Normal
            },
            own: msg.username == local_username,
        }
    }

    pub fn notice(payload: &ChannelSwitchPayload) -> Self {
        let author = if payload.username.is_empty() {
            SYSTEM_AUTHOR.to_string()
        } else {
            payload.username.clone()
        };
        let content = if payload.content.is_empty() {
            format!("Switched to channel: {}", payload.channel)
        } else {
            payload.content.clone()
        };

        Self {
            timestamp: None,
            author,
            content,
            style: LineStyle::Notice,
            own: false,
        }
    }
}

/// Render-side collaborator.
pub trait Surface: Send + Sync {
    /// Append a line to the message history.
    fn display(&self, line: &DisplayLine);
    fn clear_messages(&self);
    fn channel_added(&self, name: &str, channel_type: ChannelType);
    fn channel_updated(&self, name: &str, channel_type: ChannelType);
    fn channel_removed(&self, name: &str);
    /// Redraw the whole channel list.
    fn channels_replaced(&self, channels: &[(String, ChannelType)]);
    fn highlight_channel(&self, name: &str);
    fn current_channel(&self, name: &str);
    fn connection_status(&self, status: ConnectionStatus);
    fn set_title(&self, title: &str);
}

/// Desktop notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not decided yet.
    Default,
    /// The platform has no notification support.
    Unsupported,
}

/// Platform collaborator for notifications and sound.
pub trait Notifier: Send + Sync {
    /// Current permission. Read live, the user may change it at any time.
    fn permission(&self) -> Permission;
    fn request_permission(&self);
    fn notify(&self, title: &str, body: &str);
    /// Play a short audible cue.
    fn play_cue(&self);
}
