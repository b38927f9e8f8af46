//! `/add` and `/remove` slash commands for editing the watch list.

use serenity::all::{
    ChannelId, ChannelType, CommandDataOptionValue, CommandInteraction, CommandOptionType,
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage, Permissions,
};

const CHANNEL_OPTION: &str = "channel";

/// A parsed watch-list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    Add(ChannelId),
    Remove(ChannelId),
}

/// What happened, as reported back to the invoking member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Added(String),
    AlreadyWatched(String),
    Removed(String),
    NotWatched(String),
    MissingPermission,
    Failed,
}

impl CommandOutcome {
    pub fn reply_text(&self) -> String {
        match self {
            Self::Added(name) => format!("✅ Now showing `#{name}` on the overlay."),
            Self::AlreadyWatched(name) => format!("ℹ️ `#{name}` is already on the overlay."),
            Self::Removed(name) => format!("🗑️ `#{name}` is no longer shown on the overlay."),
            Self::NotWatched(name) => format!("ℹ️ `#{name}` is not on the overlay."),
            Self::MissingPermission => {
                "❌ You need the Manage Channels permission to use this command.".into()
            },
            Self::Failed => "😭 Something went wrong, please try again.".into(),
        }
    }
}

/// Command definitions registered with Discord on ready.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        watch_command("add", "Show a channel on the overlay", "Text channel to add"),
        watch_command(
            "remove",
            "Stop showing a channel on the overlay",
            "Text channel to remove",
        ),
    ]
}

fn watch_command(name: &str, description: &str, option: &str) -> CreateCommand {
    CreateCommand::new(name)
        .description(description)
        .default_member_permissions(Permissions::MANAGE_CHANNELS)
        .add_option(
            CreateCommandOption::new(CommandOptionType::Channel, CHANNEL_OPTION, option)
                .required(true)
                .channel_types(vec![ChannelType::Text]),
        )
}

pub fn parse(cmd: &CommandInteraction) -> Option<WatchCommand> {
    let channel = cmd
        .data
        .options
        .iter()
        .find(|o| o.name == CHANNEL_OPTION)
        .and_then(|o| match o.value {
            CommandDataOptionValue::Channel(id) => Some(id),
            _ => None,
        })?;
    match cmd.data.name.as_str() {
        "add" => Some(WatchCommand::Add(channel)),
        "remove" => Some(WatchCommand::Remove(channel)),
        _ => None,
    }
}

/// Discord enforces the default permission, but guild admins can override
/// it per command, so the invoker is checked again here.
pub fn invoker_can_manage(cmd: &CommandInteraction) -> bool {
    cmd.member
        .as_ref()
        .and_then(|m| m.permissions)
        .is_some_and(|p| p.manage_channels())
}

/// Channel name from the interaction's resolved data.
pub fn resolved_channel_name(cmd: &CommandInteraction, channel: ChannelId) -> String {
    cmd.data
        .resolved
        .channels
        .get(&channel)
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| channel.to_string())
}

pub fn ephemeral_reply(outcome: &CommandOutcome) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(outcome.reply_text())
            .ephemeral(true),
    )
}
