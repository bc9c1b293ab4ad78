//! Root controller: owns every component and runs the single event loop.

use std::sync::Arc;

use chat_common::{random_username, ChannelType};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::attention::AttentionController;
use crate::config::Config;
use crate::connection::{ConnectionEvent, ConnectionManager, Connector, TaggedEvent};
use crate::dispatcher::Dispatcher;
use crate::session::{ClientSnapshot, Session};
use crate::store::ChannelStore;
use crate::surface::{ConnectionStatus, Notifier, Surface};

/// User and platform input accepted by the client loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SendMessage(String),
    SwitchChannel(String),
    CreateChannel { name: String, channel_type: ChannelType },
    SetUsername(String),
    SetVisible(bool),
    SetFocused(bool),
    /// Close the current connection; the usual reconnect follows.
    Disconnect,
    Shutdown,
}

/// Cloneable handle for driving a running [`ChatClient`].
#[derive(Clone)]
pub struct ClientHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: Arc<RwLock<ClientSnapshot>>,
}

impl ClientHandle {
    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("client loop has stopped, command dropped");
        }
    }

    pub fn send_message(&self, text: impl Into<String>) {
        self.command(Command::SendMessage(text.into()));
    }

    pub fn switch_channel(&self, name: impl Into<String>) {
        self.command(Command::SwitchChannel(name.into()));
    }

    pub fn create_channel(&self, name: impl Into<String>, channel_type: ChannelType) {
        self.command(Command::CreateChannel {
            name: name.into(),
            channel_type,
        });
    }

    pub fn set_username(&self, username: impl Into<String>) {
        self.command(Command::SetUsername(username.into()));
    }

    pub fn set_visible(&self, visible: bool) {
        self.command(Command::SetVisible(visible));
    }

    pub fn set_focused(&self, focused: bool) {
        self.command(Command::SetFocused(focused));
    }

    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    pub fn shutdown(&self) {
        self.command(Command::Shutdown);
    }

    /// State as of the last event the client finished handling.
    pub fn snapshot(&self) -> ClientSnapshot {
        self.snapshot.read().clone()
    }
}

/// The synchronization core.
///
/// Every input (connection events, commands, timer firings) is handled to
/// completion on one task before the next is looked at.
pub struct ChatClient {
    session: Session,
    connection: ConnectionManager,
    channels: ChannelStore,
    attention: AttentionController,
    surface: Arc<dyn Surface>,
    notifier: Arc<dyn Notifier>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,
    commands_rx: mpsc::UnboundedReceiver<Command>,
    snapshot: Arc<RwLock<ClientSnapshot>>,
}

impl ChatClient {
    pub fn new(
        config: &Config,
        connector: Arc<dyn Connector>,
        surface: Arc<dyn Surface>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, ClientHandle) {
        let username = config.username.clone().unwrap_or_else(random_username);
        let (connection, events_rx) =
            ConnectionManager::new(&config.server_url, config.reconnect_delay, connector);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let snapshot = Arc::new(RwLock::new(ClientSnapshot::default()));

        let client = Self {
            session: Session::new(username),
            connection,
            channels: ChannelStore::new(&config.default_channel),
            attention: AttentionController::new(&config.title, config.blink_interval),
            surface,
            notifier,
            events_rx,
            commands_rx,
            snapshot: Arc::clone(&snapshot),
        };
        client.publish();

        let handle = ClientHandle {
            commands: commands_tx,
            snapshot,
        };
        (client, handle)
    }

    /// Run until [`ClientHandle::shutdown`] is called or every handle is
    /// dropped.
    pub async fn run(mut self) {
        tracing::info!(username = %self.session.username(), "chat client starting");

        self.attention
            .request_permission_if_undecided(self.notifier.as_ref());
        self.surface.set_title(self.attention.title());
        self.surface.connection_status(ConnectionStatus::Disconnected);
        self.surface
            .channels_replaced(self.channels.known_channels());
        self.surface
            .highlight_channel(self.channels.active_channel());
        self.surface
            .current_channel(self.channels.active_channel());

        self.connection.connect();
        self.publish();

        loop {
            tokio::select! {
                Some(tagged) = self.events_rx.recv() => self.on_connection_event(tagged),

                command = self.commands_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },

                _ = wait_until(self.connection.reconnect_deadline()) => {
                    self.connection.reconnect_due();
                }

                _ = wait_until(self.attention.blink_deadline()) => {
                    self.attention.on_blink_tick(self.surface.as_ref());
                }
            }
            self.publish();
        }

        self.connection.shutdown();
        self.surface.connection_status(ConnectionStatus::Disconnected);
        self.publish();
        tracing::info!("chat client stopped");
    }

    fn dispatcher(&mut self) -> Dispatcher<'_> {
        Dispatcher {
            session: &self.session,
            connection: &mut self.connection,
            channels: &mut self.channels,
            attention: &mut self.attention,
            surface: self.surface.as_ref(),
            notifier: self.notifier.as_ref(),
        }
    }

    fn on_connection_event(&mut self, tagged: TaggedEvent) {
        let Some(event) = self.connection.handle_event(tagged) else {
            return;
        };

        match event {
            ConnectionEvent::Opened => {
                // Presence goes out before anything else on this link.
                self.dispatcher().announce();
                self.surface.connection_status(ConnectionStatus::Connected);
            }
            ConnectionEvent::Frame(raw) => self.dispatcher().handle_frame(&raw),
            ConnectionEvent::Closed { .. } | ConnectionEvent::Failed(_) => {
                self.surface.connection_status(ConnectionStatus::Disconnected);
            }
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::SendMessage(text) => {
                self.dispatcher().send_message(&text);
            }
            Command::SwitchChannel(name) => {
                self.dispatcher().switch_channel(&name);
            }
            Command::CreateChannel { name, channel_type } => {
                self.dispatcher().create_channel(&name, channel_type);
            }
            Command::SetUsername(name) => {
                self.session.set_username(&name);
                tracing::info!(username = %self.session.username(), "username changed");
            }
            Command::SetVisible(visible) => {
                self.attention.set_visible(visible, self.surface.as_ref());
            }
            Command::SetFocused(focused) => {
                self.attention.set_focused(focused, self.surface.as_ref());
            }
            Command::Disconnect => {
                if self.connection.disconnect().is_some() {
                    self.surface.connection_status(ConnectionStatus::Disconnected);
                }
            }
            Command::Shutdown => {}
        }
    }

    fn publish(&self) {
        let snapshot = ClientSnapshot {
            username: self.session.username().to_string(),
            active_channel: self.channels.active_channel().to_string(),
            channels: self.channels.known_channels().to_vec(),
            connection: self.connection.state(),
            attended: self.attention.is_attended(),
            unseen: self.attention.unseen(),
        };
        *self.snapshot.write() = snapshot;
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
