use std::path::PathBuf;

use {
    chatcast_protocol::{DEFAULT_HOST, DEFAULT_MAX_MESSAGES, DEFAULT_PORT, REPLAY_INTERVAL_MS},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatcastConfig {
    pub server: ServerConfig,
    pub history: HistoryConfig,
    pub fonts: FontsConfig,
    pub discord: DiscordConfig,
}

/// Relay listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to. Defaults to "localhost".
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
        }
    }
}

/// In-memory history kept for late-joining overlays.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of messages retained and sent in every `init` snapshot.
    pub max_messages: usize,
    /// Pacing between `new` frames when a batch of history is replayed.
    pub replay_interval_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            replay_interval_ms: REPLAY_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    /// Directory scanned for `.ttf`, `.otf`, `.woff` and `.woff2` files.
    pub dir: PathBuf,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("fonts"),
        }
    }
}

/// Discord bot account and watched channels.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub token: Secret<String>,
    /// Channel ids whose messages are relayed.
    pub watch_channels: Vec<u64>,
    /// Seed the history from the watched channels when the bot connects.
    pub history_on_ready: bool,
}

impl DiscordConfig {
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            watch_channels: Vec::new(),
            history_on_ready: true,
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("watch_channels", &self.watch_channels)
            .field("history_on_ready", &self.history_on_ready)
            .finish()
    }
}
