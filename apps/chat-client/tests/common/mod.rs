#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use chat_client::connection::{ConnectionEvent, Connector, EventSink};
use chat_client::surface::{ConnectionStatus, DisplayLine, Notifier, Permission, Surface};
use chat_client::{ChatClient, ClientHandle, ClientSnapshot, Config};
use chat_common::ChannelType;

// ---------------------------------------------------------------------------
// Recording collaborators
// ---------------------------------------------------------------------------

/// Every call the client made on its surface, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Display(DisplayLine),
    Clear,
    Added(String, ChannelType),
    Updated(String, ChannelType),
    Removed(String),
    Replaced(Vec<(String, ChannelType)>),
    Highlight(String),
    Current(String),
    Status(ConnectionStatus),
    Title(String),
}

#[derive(Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    pub fn lines(&self) -> Vec<DisplayLine> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::Display(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::Title(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_highlight(&self) -> Option<String> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            SurfaceCall::Highlight(name) => Some(name.clone()),
            _ => None,
        })
    }

    pub fn last_status(&self) -> Option<ConnectionStatus> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            SurfaceCall::Status(status) => Some(*status),
            _ => None,
        })
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().push(call);
    }
}

impl Surface for RecordingSurface {
    fn display(&self, line: &DisplayLine) {
        self.record(SurfaceCall::Display(line.clone()));
    }
    fn clear_messages(&self) {
        self.record(SurfaceCall::Clear);
    }
    fn channel_added(&self, name: &str, channel_type: ChannelType) {
        self.record(SurfaceCall::Added(name.to_string(), channel_type));
    }
    fn channel_updated(&self, name: &str, channel_type: ChannelType) {
        self.record(SurfaceCall::Updated(name.to_string(), channel_type));
    }
    fn channel_removed(&self, name: &str) {
        self.record(SurfaceCall::Removed(name.to_string()));
    }
    fn channels_replaced(&self, channels: &[(String, ChannelType)]) {
        self.record(SurfaceCall::Replaced(channels.to_vec()));
    }
    fn highlight_channel(&self, name: &str) {
        self.record(SurfaceCall::Highlight(name.to_string()));
    }
    fn current_channel(&self, name: &str) {
        self.record(SurfaceCall::Current(name.to_string()));
    }
    fn connection_status(&self, status: ConnectionStatus) {
        self.record(SurfaceCall::Status(status));
    }
    fn set_title(&self, title: &str) {
        self.record(SurfaceCall::Title(title.to_string()));
    }
}

pub struct RecordingNotifier {
    pub permission: Mutex<Permission>,
    pub requests: Mutex<u32>,
    pub notifications: Mutex<Vec<(String, String)>>,
    pub cues: Mutex<u32>,
}

impl RecordingNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            requests: Mutex::new(0),
            notifications: Mutex::new(Vec::new()),
            cues: Mutex::new(0),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock()
    }
    fn request_permission(&self) {
        *self.requests.lock() += 1;
    }
    fn notify(&self, title: &str, body: &str) {
        self.notifications
            .lock()
            .push((title.to_string(), body.to_string()));
    }
    fn play_cue(&self) {
        *self.cues.lock() += 1;
    }
}

// ---------------------------------------------------------------------------
// In-memory connector
// ---------------------------------------------------------------------------

/// The server's end of an in-memory connection.
pub struct ServerSide {
    frames: mpsc::UnboundedReceiver<String>,
    events: EventSink,
    close: oneshot::Sender<()>,
}

impl ServerSide {
    /// Deliver a frame to the client.
    pub fn push(&self, frame: Value) {
        self.events.emit(ConnectionEvent::Frame(frame.to_string()));
    }

    pub fn push_raw(&self, raw: &str) {
        self.events.emit(ConnectionEvent::Frame(raw.to_string()));
    }

    /// Next frame the client sent, parsed.
    pub async fn next_frame(&mut self) -> Value {
        let text = time::timeout(Duration::from_secs(5), self.frames.recv())
            .await
            .expect("timeout waiting for client frame")
            .expect("client link closed");
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Frames the client has sent that were not read yet.
    pub fn drain_frames(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.frames.try_recv() {
            frames.push(serde_json::from_str(&text).expect("client sent invalid JSON"));
        }
        frames
    }

    /// Close the connection from the server side.
    pub fn close(self) {
        let _ = self.close.send(());
    }
}

/// Connector that hands every accepted attempt to the test.
pub struct MemoryConnector {
    attempts: Mutex<Vec<Instant>>,
    accepted: mpsc::UnboundedSender<ServerSide>,
}

impl MemoryConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerSide>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            attempts: Mutex::new(Vec::new()),
            accepted,
        });
        (connector, rx)
    }

    /// When each connection attempt started.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn run(&self, _url: String, outbound: mpsc::UnboundedReceiver<String>, events: EventSink) {
        self.attempts.lock().push(Instant::now());
        events.emit(ConnectionEvent::Opened);

        let (close_tx, close_rx) = oneshot::channel();
        let server = ServerSide {
            frames: outbound,
            events: events.clone(),
            close: close_tx,
        };
        if self.accepted.send(server).is_err() {
            return;
        }

        let _ = close_rx.await;
        events.emit(ConnectionEvent::Closed {
            reason: Some("server closed".to_string()),
        });
    }
}

/// Receive the next accepted in-memory connection.
pub async fn accept(accepted: &mut mpsc::UnboundedReceiver<ServerSide>) -> ServerSide {
    time::timeout(Duration::from_secs(5), accepted.recv())
        .await
        .expect("timeout waiting for connection attempt")
        .expect("connector dropped")
}

// ---------------------------------------------------------------------------
// Client harness
// ---------------------------------------------------------------------------

pub fn test_config(server_url: &str) -> Config {
    Config {
        server_url: server_url.to_string(),
        username: Some("alice".to_string()),
        ..Config::default()
    }
}

pub struct TestClient {
    pub handle: ClientHandle,
    pub surface: Arc<RecordingSurface>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Spawn a client with recording collaborators.
pub fn spawn_client(config: &Config, connector: Arc<dyn Connector>, permission: Permission) -> TestClient {
    let surface = Arc::new(RecordingSurface::default());
    let notifier = Arc::new(RecordingNotifier::new(permission));
    let (client, handle) = ChatClient::new(config, connector, surface.clone(), notifier.clone());
    tokio::spawn(client.run());
    TestClient {
        handle,
        surface,
        notifier,
    }
}

/// Let the client loop drain everything queued so far.
pub async fn settle() {
    time::sleep(Duration::from_millis(10)).await;
}

/// Poll the client snapshot until `check` passes.
pub async fn wait_for(handle: &ClientHandle, check: impl Fn(&ClientSnapshot) -> bool) -> ClientSnapshot {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = handle.snapshot();
        if check(&snapshot) {
            return snapshot;
        }
        assert!(Instant::now() < deadline, "condition not reached, last snapshot: {snapshot:?}");
        time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until `check` passes.
pub async fn eventually(check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(Instant::now() < deadline, "condition not reached");
        time::sleep(Duration::from_millis(10)).await;
    }
}

// ---------------------------------------------------------------------------
// WebSocket test server
// ---------------------------------------------------------------------------

/// Frames the test server received, in order.
pub type Received = Arc<Mutex<Vec<Value>>>;

/// Start a small chat server on a real TCP port.
///
/// On `user_connected` it sends a channel snapshot and a switch into the
/// requested channel; `join_channel` and `create_channel` switch (creating the
/// channel if needed); `message` frames are echoed back with a timestamp.
pub async fn start_ws_server() -> (SocketAddr, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let state = received.clone();
    let app = Router::new().route(
        "/ws",
        get(move |ws: WebSocketUpgrade| {
            let state = state.clone();
            async move { ws.on_upgrade(move |socket| serve_socket(socket, state)).into_response() }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, received)
}

async fn serve_socket(socket: WebSocket, received: Received) {
    let (mut tx, mut rx) = socket.split();
    let mut channels: Vec<(String, &'static str)> = vec![("general".to_string(), "ephemeral")];
    let mut current = String::new();

    while let Some(Ok(msg)) = rx.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let frame: Value = match serde_json::from_str(text.as_str()) {
            Ok(v) => v,
            Err(_) => continue,
        };
        received.lock().push(frame.clone());

        let mut replies: Vec<Value> = Vec::new();

        match frame["type"].as_str().unwrap_or_default() {
            "user_connected" => {
                let listing: Vec<Value> = channels
                    .iter()
                    .map(|(n, t)| json!({ "name": n, "type": t }))
                    .collect();
                replies.push(json!({ "type": "active_channels", "channels": listing }));
                let requested = frame["channel"].as_str().unwrap_or("general").to_string();
                switch_to(&mut channels, &mut current, &requested, "ephemeral", &mut replies);
            }
            "join_channel" => {
                let name = frame["channel"].as_str().unwrap_or("general").to_string();
                switch_to(&mut channels, &mut current, &name, "ephemeral", &mut replies);
            }
            "create_channel" => {
                let name = frame["name"].as_str().unwrap_or_default().to_string();
                let kind = if frame["channel_type"] == "persistent" {
                    "persistent"
                } else {
                    "ephemeral"
                };
                switch_to(&mut channels, &mut current, &name, kind, &mut replies);
            }
            "message" => {
                let mut echo = frame.clone();
                echo["timestamp"] = json!("2025-06-01T12:30:00Z");
                echo["channel"] = json!(current);
                replies.push(echo);
            }
            _ => {}
        }

        for reply in replies {
            if tx.send(Message::Text(reply.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

fn switch_to(
    channels: &mut Vec<(String, &'static str)>,
    current: &mut String,
    name: &str,
    kind: &'static str,
    replies: &mut Vec<Value>,
) {
    let known: HashSet<&str> = channels.iter().map(|(n, _)| n.as_str()).collect();
    if !known.contains(name) {
        channels.push((name.to_string(), kind));
        replies.push(json!({ "type": "channel_created", "name": name, "channel_type": kind }));
    }
    *current = name.to_string();
    replies.push(json!({
        "type": "channel_switch",
        "username": "System",
        "content": format!("Switched to channel: {name}"),
        "channel": name,
    }));
}
