//! Conversion of Discord messages into the overlay's canonical shape.

use std::num::NonZeroUsize;

use {
    chatcast_gateway::history::most_recent,
    chatcast_protocol::{Attachment, CanonicalMessage, Embed},
    chrono::{DateTime, Utc},
    serenity::all::{Message, Timestamp},
};

/// Discord caps a single history request at 100 messages.
pub const MAX_FETCH_PER_CHANNEL: usize = 100;

/// Name shown for an author: guild nickname, then global display name, then
/// username.
pub fn display_name(nick: Option<&str>, global_name: Option<&str>, username: &str) -> String {
    nick.filter(|n| !n.is_empty())
        .or(global_name.filter(|n| !n.is_empty()))
        .unwrap_or(username)
        .to_string()
}

pub fn to_utc(ts: &Timestamp) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&ts.to_string())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| DateTime::from_timestamp(ts.unix_timestamp(), 0))
        .unwrap_or_default()
}

pub fn canonical_message(msg: &Message, channel_name: &str) -> CanonicalMessage {
    let nick = msg.member.as_ref().and_then(|m| m.nick.as_deref());
    CanonicalMessage {
        id: msg.id.to_string(),
        channel_name: channel_name.to_string(),
        author_display_name: display_name(
            nick,
            msg.author.global_name.as_deref(),
            &msg.author.name,
        ),
        author_avatar_url: msg.author.face(),
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                url: a.url.clone(),
                filename: a.filename.clone(),
                content_type: a.content_type.clone(),
            })
            .collect(),
        embeds: msg
            .embeds
            .iter()
            .map(|e| Embed {
                title: e.title.clone(),
                description: e.description.clone(),
                url: e.url.clone(),
                color: e.colour.map(|c| c.0),
                image_url: e.image.as_ref().map(|i| i.url.clone()),
                thumbnail_url: e.thumbnail.as_ref().map(|t| t.url.clone()),
                video_url: e.video.as_ref().map(|v| v.url.clone()),
            })
            .collect(),
        timestamp: to_utc(&msg.timestamp),
    }
}

/// How many recent messages to fetch from each of `channels` channels so the
/// merged result can fill a buffer of `max_messages`.
pub fn per_channel_limit(max_messages: usize, channels: usize) -> u8 {
    let share = (max_messages / channels.max(1)).max(1);
    u8::try_from(share.min(MAX_FETCH_PER_CHANNEL)).unwrap_or(u8::MAX)
}

/// Merge per-channel histories into one list sorted by timestamp, keeping the
/// most recent `max_messages`.
pub fn merge_histories(
    per_channel: Vec<Vec<CanonicalMessage>>,
    max_messages: usize,
) -> Vec<CanonicalMessage> {
    match NonZeroUsize::new(max_messages) {
        Some(max) => most_recent(per_channel.into_iter().flatten().collect(), max),
        None => Vec::new(),
    }
}
