use {
    chatcast_protocol::CanonicalMessage,
    serenity::all::{Cache, ChannelId, Context, GetMessages, GuildId},
    tracing::{debug, warn},
};

use crate::{
    error::Result,
    normalize::{canonical_message, merge_histories, per_channel_limit},
};

/// Guild channel name from the cache or the API, falling back to the id.
pub async fn channel_label(ctx: &Context, channel: ChannelId) -> String {
    match channel.name(ctx).await {
        Ok(name) => name,
        Err(e) => {
            debug!(channel_id = %channel, error = %e, "channel name lookup failed");
            channel.to_string()
        },
    }
}

/// Channel name from the guild cache only, falling back to the id.
///
/// The live message path uses this so relaying never waits on the API.
/// serenity still dispatches each event on its own task, so two messages
/// that arrive together may reach the queue in either order.
pub fn cached_channel_label(
    cache: &Cache,
    guild: Option<GuildId>,
    channel: ChannelId,
) -> String {
    let name = guild
        .and_then(|id| cache.guild(id))
        .and_then(|g| g.channels.get(&channel).map(|c| c.name.clone()));
    label_or_id(name, channel)
}

fn label_or_id(name: Option<String>, channel: ChannelId) -> String {
    name.filter(|n| !n.is_empty()).unwrap_or_else(|| channel.to_string())
}

/// Most recent `limit` messages of one channel, normalized.
pub async fn fetch_channel(
    ctx: &Context,
    channel: ChannelId,
    limit: u8,
) -> Result<Vec<CanonicalMessage>> {
    let name = channel_label(ctx, channel).await;
    let messages = channel
        .messages(ctx, GetMessages::new().limit(limit))
        .await?;
    debug!(channel = %name, count = messages.len(), "fetched channel history");
    Ok(messages
        .iter()
        .map(|m| canonical_message(m, &name))
        .collect())
}

/// Recent history across all `channels`, merged and trimmed to
/// `max_messages`. Channels that fail to load are skipped.
pub async fn fetch_watched(
    ctx: &Context,
    channels: &[u64],
    max_messages: usize,
) -> Vec<CanonicalMessage> {
    let channels: Vec<u64> = channels.iter().copied().filter(|id| *id != 0).collect();
    if channels.is_empty() {
        return Vec::new();
    }
    let limit = per_channel_limit(max_messages, channels.len());

    let mut per_channel = Vec::with_capacity(channels.len());
    for id in channels {
        match fetch_channel(ctx, ChannelId::new(id), limit).await {
            Ok(messages) => per_channel.push(messages),
            Err(e) => warn!(channel_id = id, error = %e, "failed to fetch channel history"),
        }
    }
    merge_histories(per_channel, max_messages)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn uncached_channel_falls_back_to_id() {
        let cache = Cache::new();
        let channel = ChannelId::new(42);
        assert_eq!(cached_channel_label(&cache, None, channel), "42");
        assert_eq!(
            cached_channel_label(&cache, Some(GuildId::new(7)), channel),
            "42"
        );
    }

    #[test]
    fn empty_name_falls_back_to_id() {
        let channel = ChannelId::new(9);
        assert_eq!(label_or_id(Some(String::new()), channel), "9");
        assert_eq!(label_or_id(Some("clips".into()), channel), "clips");
    }
}
