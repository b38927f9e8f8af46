//! Configuration loading, validation, env substitution, and watch-list
//! write-back.
//!
//! Config files: `chatcast.toml`, `chatcast.yaml`, `chatcast.json`, or the
//! legacy flat `config.yaml`. Searched in `./` then `~/.config/chatcast/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;
pub mod watch;

pub use {
    error::{Error, Result},
    loader::{LoadedConfig, apply_env_overrides, config_dir, find_config_file, load, load_config},
    schema::{ChatcastConfig, DiscordConfig, FontsConfig, HistoryConfig, ServerConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
    watch::save_watch_channels,
};
