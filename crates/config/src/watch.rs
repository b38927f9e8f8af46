//! Write-back of the watched-channel list into an existing config file.
//!
//! Only the watch list is touched. TOML files are edited in place so
//! comments and layout survive; YAML and JSON are rewritten from their
//! parsed tree. A file using the legacy flat `WATCH_CHANNELS` key keeps it.

use std::path::Path;

use tracing::debug;

use crate::{
    error::{Error, Result},
    loader::format_of,
};

const LEGACY_KEY: &str = "WATCH_CHANNELS";

/// Persist `ids` as the watch list of the config file at `path`.
///
/// The raw (un-substituted) file is edited, so `${VAR}` placeholders
/// elsewhere in the file are preserved.
pub fn save_watch_channels(path: &Path, ids: &[u64]) -> Result<()> {
    let raw = if path.exists() {
        std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        String::new()
    };

    let updated = match format_of(path) {
        "toml" => update_toml(&raw, ids).map_err(|e| Error::parse(path, e))?,
        "yaml" | "yml" => update_yaml(&raw, ids).map_err(|e| Error::parse(path, e))?,
        "json" => update_json(&raw, ids)?,
        ext => return Err(Error::UnsupportedFormat(ext.to_string())),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, updated).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), count = ids.len(), "saved watch list");
    Ok(())
}

fn update_toml(raw: &str, ids: &[u64]) -> std::result::Result<String, toml_edit::TomlError> {
    let mut doc = raw.parse::<toml_edit::DocumentMut>()?;
    let array: toml_edit::Array = ids
        .iter()
        .filter_map(|id| i64::try_from(*id).ok())
        .collect();
    if doc.contains_key(LEGACY_KEY) {
        doc[LEGACY_KEY] = toml_edit::value(array);
    } else {
        if !doc.get("discord").is_some_and(toml_edit::Item::is_table) {
            doc["discord"] = toml_edit::table();
        }
        doc["discord"]["watch_channels"] = toml_edit::value(array);
    }
    Ok(doc.to_string())
}

fn update_yaml(raw: &str, ids: &[u64]) -> std::result::Result<String, serde_yaml::Error> {
    use serde_yaml::{Mapping, Value};

    let mut root: Value = if raw.trim().is_empty() {
        Value::Mapping(Mapping::new())
    } else {
        serde_yaml::from_str(raw)?
    };
    if root.is_null() {
        root = Value::Mapping(Mapping::new());
    }
    let list = serde_yaml::to_value(ids)?;

    if let Value::Mapping(map) = &mut root {
        let legacy = Value::String(LEGACY_KEY.into());
        if map.contains_key(&legacy) {
            map.insert(legacy, list);
        } else {
            let section = map
                .entry(Value::String("discord".into()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !section.is_mapping() {
                *section = Value::Mapping(Mapping::new());
            }
            if let Value::Mapping(discord) = section {
                discord.insert(Value::String("watch_channels".into()), list);
            }
        }
    }
    serde_yaml::to_string(&root)
}

fn update_json(raw: &str, ids: &[u64]) -> Result<String> {
    let mut root: serde_json::Value = if raw.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(raw)?
    };
    if root.get(LEGACY_KEY).is_some() {
        root[LEGACY_KEY] = serde_json::json!(ids);
    } else {
        root["discord"]["watch_channels"] = serde_json::json!(ids);
    }
    Ok(serde_json::to_string_pretty(&root)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, crate::loader::load_config};

    #[test]
    fn toml_edit_keeps_comments_and_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcast.toml");
        std::fs::write(
            &path,
            "# overlay relay\n[server]\nport = 9001 # custom\n\n[discord]\ntoken = \"${DISCORD_BOT_TOKEN}\"\nwatch_channels = [1]\n",
        )
        .unwrap();

        save_watch_channels(&path, &[1, 22]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("# overlay relay"));
        assert!(written.contains("# custom"));
        assert!(written.contains("${DISCORD_BOT_TOKEN}"));
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.watch_channels, vec![1, 22]);
        assert_eq!(cfg.server.port, 9001);
    }

    #[test]
    fn toml_without_discord_section_gets_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcast.toml");
        std::fs::write(&path, "[history]\nmax_messages = 4\n").unwrap();

        save_watch_channels(&path, &[7]).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.watch_channels, vec![7]);
        assert_eq!(cfg.history.max_messages, 4);
    }

    #[test]
    fn legacy_yaml_keeps_flat_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "DISCORD_BOT_TOKEN: tok\nWATCH_CHANNELS:\n- 1\n").unwrap();

        save_watch_channels(&path, &[]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("WATCH_CHANNELS"));
        assert!(!written.contains("discord"));
        let cfg = load_config(&path).unwrap();
        assert!(cfg.discord.watch_channels.is_empty());
    }

    #[test]
    fn json_round_trips_watch_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatcast.json");
        std::fs::write(&path, r#"{"server":{"port":8000}}"#).unwrap();

        save_watch_channels(&path, &[5, 6]).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.watch_channels, vec![5, 6]);
        assert_eq!(cfg.server.port, 8000);
    }
}
