use std::time::Duration;

use chat_common::frame::DEFAULT_CHANNEL;

use crate::error::ClientError;

const DEFAULT_SERVER_URL: &str = "ws://localhost:8080/ws";
const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;
const DEFAULT_BLINK_INTERVAL_MS: u64 = 1500;
const DEFAULT_TITLE: &str = "Chat";

/// Chat client configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint of the message server.
    pub server_url: String,
    /// Initial username. A random one is generated when unset.
    pub username: Option<String>,
    /// Channel the client starts in and falls back to.
    pub default_channel: String,
    /// Fixed delay between a connection loss and the next attempt.
    pub reconnect_delay: Duration,
    /// Period of the unseen-message title blink.
    pub blink_interval: Duration,
    /// Static window title.
    pub title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            username: None,
            default_channel: DEFAULT_CHANNEL.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            blink_interval: Duration::from_millis(DEFAULT_BLINK_INTERVAL_MS),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. Unset or malformed
    /// optional values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string());

        let server_url = var("CHAT_SERVER_URL").unwrap_or(defaults.server_url);
        if server_url.is_empty() {
            return Err(ClientError::config("CHAT_SERVER_URL must not be empty"));
        }
        if !server_url.starts_with("ws://") && !server_url.starts_with("wss://") {
            return Err(ClientError::config(format!(
                "CHAT_SERVER_URL must be a ws:// or wss:// URL, got `{server_url}`"
            )));
        }

        Ok(Self {
            server_url,
            username: var("CHAT_USERNAME").filter(|s| !s.is_empty()),
            default_channel: var("CHAT_DEFAULT_CHANNEL")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.default_channel),
            reconnect_delay: var("CHAT_RECONNECT_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_delay),
            blink_interval: var("CHAT_BLINK_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.blink_interval),
            title: var("CHAT_TITLE")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.title),
        })
    }
}
