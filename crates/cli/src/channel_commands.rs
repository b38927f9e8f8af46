//! Offline edits of the watched-channel list.

use std::path::Path;

use {
    anyhow::Result,
    clap::Subcommand,
};

use chatcast_config::{LoadedConfig, save_watch_channels};

#[derive(Subcommand)]
pub enum ChannelAction {
    /// Print the watched channel ids.
    List,
    /// Watch a channel.
    Add {
        /// Discord channel id.
        id: u64,
    },
    /// Stop watching a channel.
    Remove {
        /// Discord channel id.
        id: u64,
    },
}

pub fn handle_channels(action: ChannelAction, loaded: &LoadedConfig, path: &Path) -> Result<()> {
    let mut ids = loaded.config.discord.watch_channels.clone();
    match action {
        ChannelAction::List => {
            if ids.is_empty() {
                eprintln!("No channels are watched. Use `/add` in Discord or `chatcast channels add <id>`.");
            }
            for id in ids {
                println!("{id}");
            }
            return Ok(());
        },
        ChannelAction::Add { id } => {
            if !apply_add(&mut ids, id) {
                eprintln!("Channel {id} is already watched.");
                return Ok(());
            }
        },
        ChannelAction::Remove { id } => {
            if !apply_remove(&mut ids, id) {
                eprintln!("Channel {id} is not watched.");
                return Ok(());
            }
        },
    }
    save_watch_channels(path, &ids)?;
    eprintln!("Saved {} watched channel(s) to {}", ids.len(), path.display());
    Ok(())
}

fn apply_add(ids: &mut Vec<u64>, id: u64) -> bool {
    if id == 0 || ids.contains(&id) {
        return false;
    }
    ids.push(id);
    true
}

fn apply_remove(ids: &mut Vec<u64>, id: u64) -> bool {
    let before = ids.len();
    ids.retain(|existing| *existing != id);
    ids.len() != before
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn add_skips_duplicates_and_zero() {
        let mut ids = vec![1];
        assert!(apply_add(&mut ids, 2));
        assert!(!apply_add(&mut ids, 2));
        assert!(!apply_add(&mut ids, 0));
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn remove_reports_missing() {
        let mut ids = vec![1, 2];
        assert!(apply_remove(&mut ids, 1));
        assert!(!apply_remove(&mut ids, 1));
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn add_writes_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcast.toml");
        std::fs::write(&path, "[discord]\nwatch_channels = [7]\n").unwrap();
        let mut loaded = LoadedConfig::default();
        loaded.config.discord.watch_channels = vec![7];

        handle_channels(ChannelAction::Add { id: 8 }, &loaded, &path).unwrap();

        let cfg = chatcast_config::load_config(&path).unwrap();
        assert_eq!(cfg.discord.watch_channels, vec![7, 8]);
    }
}
