//! Inbound frame decoding and routing, outbound action encoding.

use chat_common::frame::{
    ActiveChannelsPayload, ChannelCreatedPayload, ChannelDeletedPayload, ChannelSwitchPayload,
};
use chat_common::{ChannelType, ChatMessage, ClientFrame, FrameType, SnapshotEntry};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::attention::AttentionController;
use crate::connection::ConnectionManager;
use crate::session::Session;
use crate::store::{ChannelStore, StoreChange};
use crate::surface::{DisplayLine, Notifier, Surface};

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    ChannelSwitch(ChannelSwitchPayload),
    ChannelCreated(ChannelCreatedPayload),
    ActiveChannels(Vec<SnapshotEntry>),
    ChannelDeleted { name: String },
    Message(ChatMessage),
}

/// A frame that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub raw: String,
    pub reason: String,
}

impl DecodeFailure {
    fn new(raw: &str, err: serde_json::Error) -> Self {
        Self {
            raw: raw.to_string(),
            reason: err.to_string(),
        }
    }

    /// The system message shown in place of the undecodable frame.
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::system(self.raw)
    }
}

/// Decode one inbound frame. Frames without a recognised `type` are chat
/// messages.
pub fn decode(raw: &str) -> Result<ParsedEvent, DecodeFailure> {
    let value: Value = serde_json::from_str(raw).map_err(|e| DecodeFailure::new(raw, e))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(FrameType::MESSAGE)
        .to_string();

    let event = match kind.as_str() {
        FrameType::CHANNEL_SWITCH => ParsedEvent::ChannelSwitch(payload(raw, value)?),
        FrameType::CHANNEL_CREATED => ParsedEvent::ChannelCreated(payload(raw, value)?),
        FrameType::ACTIVE_CHANNELS => {
            let snapshot: ActiveChannelsPayload = payload(raw, value)?;
            ParsedEvent::ActiveChannels(snapshot.channels)
        }
        FrameType::CHANNEL_DELETED => {
            let deleted: ChannelDeletedPayload = payload(raw, value)?;
            ParsedEvent::ChannelDeleted {
                name: deleted.content,
            }
        }
        _ => ParsedEvent::Message(payload(raw, value)?),
    };
    Ok(event)
}

fn payload<T: DeserializeOwned>(raw: &str, value: Value) -> Result<T, DecodeFailure> {
    serde_json::from_value(value).map_err(|e| DecodeFailure::new(raw, e))
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routes decoded events to the store, the attention controller and the
/// surface, and turns user actions into outbound frames.
///
/// Borrowed fresh from the client for each event; holds no state itself.
pub struct Dispatcher<'a> {
    pub session: &'a Session,
    pub connection: &'a mut ConnectionManager,
    pub channels: &'a mut ChannelStore,
    pub attention: &'a mut AttentionController,
    pub surface: &'a dyn Surface,
    pub notifier: &'a dyn Notifier,
}

impl Dispatcher<'_> {
    /// Decode and route one inbound frame. Never fails: undecodable frames
    /// are shown as system messages.
    pub fn handle_frame(&mut self, raw: &str) {
        match decode(raw) {
            Ok(event) => self.route(event),
            Err(failure) => {
                tracing::warn!(reason = %failure.reason, "undecodable frame");
                let line = DisplayLine::from_message(&failure.into_message(), self.session.username());
                self.surface.display(&line);
            }
        }
    }

    pub fn route(&mut self, event: ParsedEvent) {
        match event {
            ParsedEvent::ChannelSwitch(switch) => {
                tracing::debug!(channel = %switch.channel, "switched channel");
                self.channels.set_active(&switch.channel);
                self.surface.clear_messages();
                self.render_changes();
                self.surface.current_channel(self.channels.active_channel());
                self.surface.display(&DisplayLine::notice(&switch));
            }
            ParsedEvent::ChannelCreated(created) => {
                self.channels.add_channel(&created.name, created.channel_type);
                self.render_changes();
            }
            ParsedEvent::ActiveChannels(entries) => {
                tracing::debug!(count = entries.len(), "channel snapshot");
                self.channels.apply_snapshot(entries);
                self.render_changes();
            }
            ParsedEvent::ChannelDeleted { name } => {
                let was_active = self.channels.active_channel() == name;
                self.channels.remove_channel(&name);
                self.render_changes();
                if was_active {
                    tracing::info!(channel = %name, "active channel deleted, returning to default");
                    let fallback = self.channels.default_channel().to_string();
                    self.connection.send(&ClientFrame::JoinChannel { channel: fallback });
                    self.surface.current_channel(self.channels.active_channel());
                }
            }
            ParsedEvent::Message(msg) => {
                let username = self.session.username();
                self.surface.display(&DisplayLine::from_message(&msg, username));
                self.attention
                    .on_message(&msg, username, self.notifier, self.surface);
            }
        }
    }

    /// Push store changes to the surface. The active highlight follows the
    /// store: it is redrawn whenever the active channel changes or appears.
    pub fn render_changes(&mut self) {
        for change in self.channels.take_changes() {
            match change {
                StoreChange::Added { name, channel_type } => {
                    self.surface.channel_added(&name, channel_type);
                    if name == self.channels.active_channel() {
                        self.surface.highlight_channel(&name);
                    }
                }
                StoreChange::Updated { name, channel_type } => {
                    self.surface.channel_updated(&name, channel_type);
                }
                StoreChange::Removed { name } => self.surface.channel_removed(&name),
                StoreChange::Replaced => {
                    self.surface.channels_replaced(self.channels.known_channels());
                    self.surface.highlight_channel(self.channels.active_channel());
                }
                StoreChange::ActiveChanged { name } => {
                    if self.channels.contains(&name) {
                        self.surface.highlight_channel(&name);
                    }
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Outbound actions
    // -----------------------------------------------------------------------

    /// Send a chat message to the active channel. Blank text is ignored.
    pub fn send_message(&mut self, text: &str) -> bool {
        let content = text.trim();
        if content.is_empty() {
            return false;
        }
        self.connection.send(&ClientFrame::Message {
            username: self.session.username().to_string(),
            content: content.to_string(),
            channel: self.channels.active_channel().to_string(),
        })
    }

    /// Ask the server to move us to `name`. No-op if already there; the
    /// local state changes when the server confirms with `channel_switch`.
    pub fn switch_channel(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || name == self.channels.active_channel() {
            return false;
        }
        self.connection.send(&ClientFrame::JoinChannel {
            channel: name.to_string(),
        })
    }

    pub fn create_channel(&mut self, name: &str, channel_type: ChannelType) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.connection.send(&ClientFrame::CreateChannel {
            name: name.to_string(),
            channel_type,
        })
    }

    /// Announce presence on a freshly opened connection.
    pub fn announce(&mut self) -> bool {
        self.connection.send(&ClientFrame::presence(
            self.session.username(),
            self.channels.active_channel(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_channel_switch() {
        let event = decode(
            r#"{"type":"channel_switch","channel":"dev","username":"System","content":"Switched to channel: dev"}"#,
        )
        .unwrap();
        match event {
            ParsedEvent::ChannelSwitch(switch) => {
                assert_eq!(switch.channel, "dev");
                assert_eq!(switch.content, "Switched to channel: dev");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decodes_channel_created() {
        let event =
            decode(r#"{"type":"channel_created","name":"random","channel_type":"ephemeral"}"#).unwrap();
        assert_eq!(
            event,
            ParsedEvent::ChannelCreated(ChannelCreatedPayload {
                name: "random".to_string(),
                channel_type: ChannelType::Ephemeral,
            })
        );
    }

    #[test]
    fn decodes_active_channels_in_both_shapes() {
        let event = decode(
            r#"{"type":"active_channels","channels":["general",{"name":"archive","type":"persistent"}]}"#,
        )
        .unwrap();
        let ParsedEvent::ActiveChannels(entries) = event else {
            panic!("expected snapshot");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], SnapshotEntry::Name("general".to_string()));
    }

    #[test]
    fn decodes_channel_deleted_from_content() {
        let event = decode(
            r#"{"type":"channel_deleted","username":"System","content":"random","channel":"random"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ParsedEvent::ChannelDeleted {
                name: "random".to_string()
            }
        );
    }

    #[test]
    fn untyped_and_unknown_frames_are_messages() {
        let event = decode(r#"{"username":"bob","content":"hi"}"#).unwrap();
        let ParsedEvent::Message(msg) = event else {
            panic!("expected message");
        };
        assert_eq!(msg.kind, "message");
        assert_eq!(msg.username, "bob");

        let event = decode(r#"{"type":"system_message","username":"System","content":"bob joined the channel"}"#)
            .unwrap();
        let ParsedEvent::Message(msg) = event else {
            panic!("expected message");
        };
        assert!(msg.is_system());
        assert!(!msg.is_user_message());
    }

    #[test]
    fn malformed_frames_become_system_messages() {
        let failure = decode("not json at all").unwrap_err();
        assert_eq!(failure.raw, "not json at all");
        let msg = failure.into_message();
        assert_eq!(msg.username, "System");
        assert_eq!(msg.content, "not json at all");

        // Known type with a missing required field.
        let failure = decode(r#"{"type":"channel_switch"}"#).unwrap_err();
        assert!(failure.reason.contains("channel"));

        // Valid JSON that is not an object.
        assert!(decode("42").is_err());
    }
}
