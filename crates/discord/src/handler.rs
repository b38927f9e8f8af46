//! Discord event handler for serenity.
//!
//! Turns gateway events into [`InboundEvent`]s for the relay.

use {
    chatcast_gateway::{InboundEvent, InboundSender},
    chatcast_protocol::CanonicalMessage,
    serenity::{
        all::{
            Command, CommandInteraction, Context, EventHandler, GatewayIntents, Interaction,
            Message, Ready,
        },
        async_trait,
    },
    tracing::{debug, error, info, warn},
};

use crate::{
    commands::{self, CommandOutcome, WatchCommand},
    history::{cached_channel_label, fetch_watched},
    normalize::canonical_message,
    watchlist::WatchList,
};

/// Handler for Discord gateway events.
pub struct RelayHandler {
    pub watch: WatchList,
    pub inbound: InboundSender,
    pub max_messages: usize,
    /// Seed the relay history from the watched channels on ready.
    pub history_on_ready: bool,
}

impl RelayHandler {
    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    async fn handle_command(&self, ctx: &Context, cmd: &CommandInteraction) {
        let Some(parsed) = commands::parse(cmd) else {
            debug!(command = %cmd.data.name, "ignoring unknown command");
            return;
        };

        let outcome = if !commands::invoker_can_manage(cmd) {
            CommandOutcome::MissingPermission
        } else {
            self.apply_command(cmd, parsed).await
        };

        if let Err(e) = cmd
            .create_response(&ctx.http, commands::ephemeral_reply(&outcome))
            .await
        {
            warn!(command = %cmd.data.name, error = %e, "failed to answer command");
        }

        // Refresh history after answering: Discord expects a reply within
        // three seconds.
        match outcome {
            CommandOutcome::Added(_) => {
                let messages = self.watched_history(ctx).await;
                self.inbound.send(InboundEvent::Replay(messages));
            },
            CommandOutcome::Removed(_) => {
                let messages = self.watched_history(ctx).await;
                self.inbound.send(InboundEvent::Reload(messages));
            },
            _ => {},
        }
    }

    async fn apply_command(
        &self,
        cmd: &CommandInteraction,
        parsed: WatchCommand,
    ) -> CommandOutcome {
        let (channel, result) = match parsed {
            WatchCommand::Add(channel) => (channel, self.watch.add(channel.get()).await),
            WatchCommand::Remove(channel) => (channel, self.watch.remove(channel.get()).await),
        };
        let name = commands::resolved_channel_name(cmd, channel);
        match (parsed, result) {
            (WatchCommand::Add(_), Ok(true)) => CommandOutcome::Added(name),
            (WatchCommand::Add(_), Ok(false)) => CommandOutcome::AlreadyWatched(name),
            (WatchCommand::Remove(_), Ok(true)) => CommandOutcome::Removed(name),
            (WatchCommand::Remove(_), Ok(false)) => CommandOutcome::NotWatched(name),
            (_, Err(e)) => {
                error!(
                    command = %cmd.data.name,
                    channel_id = %channel,
                    error = %e,
                    "watch list update failed"
                );
                CommandOutcome::Failed
            },
        }
    }

    async fn watched_history(&self, ctx: &Context) -> Vec<CanonicalMessage> {
        let ids = self.watch.ids().await;
        fetch_watched(ctx, &ids, self.max_messages).await
    }
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let watched = self.watch.ids().await;
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            watched = ?watched,
            "discord bot ready"
        );

        match Command::set_global_commands(&ctx.http, commands::definitions()).await {
            Ok(registered) => debug!(count = registered.len(), "slash commands registered"),
            Err(e) => warn!(error = %e, "failed to register slash commands"),
        }

        if self.history_on_ready {
            let messages = fetch_watched(&ctx, &watched, self.max_messages).await;
            info!(count = messages.len(), "seeding history from watched channels");
            self.inbound.send(InboundEvent::Reload(messages));
        }
        info!("waiting for overlay connections");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.id == ctx.cache.current_user().id {
            return;
        }
        if !self.watch.contains(msg.channel_id.get()).await {
            return;
        }

        let channel = cached_channel_label(&ctx.cache, msg.guild_id, msg.channel_id);
        let message = canonical_message(&msg, &channel);
        info!(
            channel = %channel,
            author = %message.author_display_name,
            "relaying message"
        );
        self.inbound.send(InboundEvent::Message(message));
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(cmd) = interaction {
            self.handle_command(&ctx, &cmd).await;
        }
    }
}
