use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    serde_json::Value,
    tracing::{debug, info},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::ChatcastConfig,
};

/// Standard config file names, checked in order. `config.yaml` is the flat
/// legacy layout and is only picked up when nothing newer exists.
const CONFIG_FILENAMES: &[&str] = &[
    "chatcast.toml",
    "chatcast.yaml",
    "chatcast.yml",
    "chatcast.json",
    "config.yaml",
];

/// Flat keys of the legacy `config.yaml` and where they live now.
const LEGACY_KEYS: &[(&str, &str, &str)] = &[
    ("DISCORD_BOT_TOKEN", "discord", "token"),
    ("WATCH_CHANNELS", "discord", "watch_channels"),
    ("WEBSOCKET_HOST", "server", "host"),
    ("WEBSOCKET_PORT", "server", "port"),
    ("HISTORY_LIMIT", "history", "max_messages"),
];

/// A parsed config together with where it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: ChatcastConfig,
    /// File the config was read from; `None` when running on defaults.
    pub path: Option<PathBuf>,
    /// The normalized document, kept for unknown-field diagnostics.
    pub raw: Option<Value>,
}

/// Load the config from `explicit` if given, otherwise from the first file
/// found in the standard locations. No file at all yields defaults.
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(p) if !p.exists() => {
            return Err(Error::NotFound {
                path: p.to_path_buf(),
            });
        },
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let Some(path) = path else {
        debug!("no config file found, using defaults");
        return Ok(LoadedConfig::default());
    };

    info!(path = %path.display(), "loading config");
    let raw = load_config_value(&path)?;
    let config = config_from_value(raw.clone(), &path)?;
    Ok(LoadedConfig {
        config,
        path: Some(path),
        raw: Some(raw),
    })
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChatcastConfig> {
    let value = load_config_value(path)?;
    config_from_value(value, path)
}

/// Read, env-substitute and parse a config file into a normalized JSON tree.
pub fn load_config_value(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    let mut value = parse_config_value(&raw, path)?;
    normalize_legacy_keys(&mut value);
    Ok(value)
}

fn config_from_value(value: Value, path: &Path) -> Result<ChatcastConfig> {
    serde_json::from_value(value).map_err(|e| Error::parse(path, e))
}

/// Find the first config file in standard locations.
///
/// Search order:
/// 1. `./chatcast.{toml,yaml,yml,json}`, then `./config.yaml`
/// 2. the same names under the user config dir (`~/.config/chatcast/`)
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chatcast/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatcast").map(|d| d.config_dir().to_path_buf())
}

/// Fill gaps in the file config from the process environment.
///
/// `DISCORD_BOT_TOKEN` supplies the token when the file leaves it empty.
pub fn apply_env_overrides(config: &mut ChatcastConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut ChatcastConfig, lookup: impl Fn(&str) -> Option<String>) {
    if !config.discord.has_token()
        && let Some(token) = lookup("DISCORD_BOT_TOKEN").filter(|t| !t.trim().is_empty())
    {
        debug!("using discord token from environment");
        config.discord.token = Secret::new(token);
    }
}

pub(crate) fn format_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn parse_config_value(raw: &str, path: &Path) -> Result<Value> {
    match format_of(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| Error::parse(path, e))?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e))?;
            // An empty YAML document parses to null.
            if v.is_null() {
                return Ok(Value::Object(serde_json::Map::new()));
            }
            Ok(serde_json::to_value(v)?)
        },
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        ext => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

/// Move legacy flat keys into their sections. A value already present in
/// the section wins over the legacy key.
fn normalize_legacy_keys(value: &mut Value) {
    let Some(root) = value.as_object_mut() else {
        return;
    };
    for (legacy, section, field) in LEGACY_KEYS {
        let Some(v) = root.remove(*legacy) else {
            continue;
        };
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Some(table) = entry.as_object_mut() {
            table.entry(field.to_string()).or_insert(v);
        }
    }
}
