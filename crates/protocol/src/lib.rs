//! Relay wire protocol definitions.
//!
//! All communication is JSON text frames over a WebSocket, and it only flows
//! one way: the relay pushes, display clients listen.
//!
//! Frame types:
//! - `init`: sent exactly once, right after the upgrade: history + fonts
//! - `new`: one per relayed chat message, for the rest of the connection

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8765;
pub const DEFAULT_MAX_MESSAGES: usize = 20;
/// Pacing between `new` frames during a bulk replay.
pub const REPLAY_INTERVAL_MS: u64 = 100;
/// A socket write that takes longer than this drops the client.
pub const SEND_TIMEOUT_MS: u64 = 5_000;
/// Frames queued per client before it is considered too slow and dropped.
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

// ── Messages ─────────────────────────────────────────────────────────────────

/// A chat message normalized away from any particular chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    /// Platform-native identifier, kept as a string so snowflake ids survive
    /// JavaScript number precision on the client.
    pub id: String,
    #[serde(rename = "channel")]
    pub channel_name: String,
    #[serde(rename = "author")]
    pub author_display_name: String,
    #[serde(rename = "avatar")]
    pub author_avatar_url: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Rich embed. Every field may be absent; absent fields serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    #[serde(rename = "image")]
    pub image_url: Option<String>,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "video")]
    pub video_url: Option<String>,
}

// ── Fonts ────────────────────────────────────────────────────────────────────

/// A font file shipped to overlays in every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontAsset {
    /// File name, e.g. `NotoSansJP-Bold.woff2`.
    pub name: String,
    pub base64_data: String,
    /// CSS `format()` hint: `truetype`, `opentype`, `woff`, `woff2`.
    pub format: String,
    pub mime_type: String,
}

// ── Frames ───────────────────────────────────────────────────────────────────

/// Relay → client push frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Init {
        messages: Vec<CanonicalMessage>,
        fonts: Vec<FontAsset>,
    },
    New {
        message: CanonicalMessage,
    },
}

impl ServerFrame {
    pub fn init(messages: Vec<CanonicalMessage>, fonts: Vec<FontAsset>) -> Self {
        Self::Init { messages, fonts }
    }

    pub fn new_message(message: CanonicalMessage) -> Self {
        Self::New { message }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> CanonicalMessage {
        CanonicalMessage {
            id: "1180000000000000007".into(),
            channel_name: "stream-chat".into(),
            author_display_name: "yuki".into(),
            author_avatar_url: "https://cdn.example.com/a.png".into(),
            content: "hello".into(),
            attachments: vec![Attachment {
                url: "https://cdn.example.com/cat.png".into(),
                filename: "cat.png".into(),
                content_type: Some("image/png".into()),
            }],
            embeds: vec![Embed {
                title: Some("link".into()),
                ..Default::default()
            }],
            timestamp: "2024-05-01T12:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn new_frame_shape() {
        let json = serde_json::to_value(ServerFrame::new_message(sample())).unwrap();
        assert_eq!(json["type"], "new");
        let msg = &json["message"];
        assert_eq!(msg["id"], "1180000000000000007");
        assert_eq!(msg["author"], "yuki");
        assert_eq!(msg["avatar"], "https://cdn.example.com/a.png");
        assert_eq!(msg["attachments"][0]["content_type"], "image/png");
        assert_eq!(msg["embeds"][0]["title"], "link");
        assert!(msg["embeds"][0]["image"].is_null());
        assert!(msg["embeds"][0]["video"].is_null());
        assert_eq!(msg["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn init_frame_shape() {
        let font = FontAsset {
            name: "Mono.woff2".into(),
            base64_data: "AAAA".into(),
            format: "woff2".into(),
            mime_type: "font/woff2".into(),
        };
        let json = serde_json::to_value(ServerFrame::init(vec![sample()], vec![font])).unwrap();
        assert_eq!(json["type"], "init");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["fonts"][0]["base64Data"], "AAAA");
        assert_eq!(json["fonts"][0]["mimeType"], "font/woff2");
    }

    #[test]
    fn frames_parse_back() {
        let text = serde_json::to_string(&ServerFrame::new_message(sample())).unwrap();
        let frame: ServerFrame = serde_json::from_str(&text).unwrap();
        assert_eq!(frame, ServerFrame::new_message(sample()));
    }
}
