//! Configuration validation.
//!
//! Runs after loading and before anything binds a socket. Errors abort
//! startup, warnings and infos are logged.

use std::{collections::HashMap, path::PathBuf};

use serde_json::Value;

use crate::{loader::LoadedConfig, schema::ChatcastConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "unknown-field", "history", "discord", "server", "fonts"
    pub category: &'static str,
    /// Dotted path, e.g. "history.max_messages"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{}: {}: {}", self.severity, self.path, self.message)
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Iterate over the error diagnostics only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

// ── Known keys ──────────────────────────────────────────────────────────────

/// Field names per section, mirroring `schema.rs`.
fn known_sections() -> HashMap<&'static str, &'static [&'static str]> {
    HashMap::from([
        ("server", ["host", "port"].as_slice()),
        ("history", ["max_messages", "replay_interval_ms"].as_slice()),
        ("fonts", ["dir"].as_slice()),
        (
            "discord",
            ["token", "watch_channels", "history_on_ready"].as_slice(),
        ),
    ])
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a loaded configuration (after env overrides and CLI overrides
/// have been applied to `loaded.config`).
#[must_use]
pub fn validate(loaded: &LoadedConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    if let Some(raw) = &loaded.raw {
        check_unknown_fields(raw, &mut diagnostics);
    }
    check_semantics(&loaded.config, &mut diagnostics);

    ValidationResult {
        diagnostics,
        config_path: loaded.path.clone(),
    }
}

fn check_unknown_fields(raw: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(root) = raw.as_object() else {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: "config root must be a table/mapping".into(),
        });
        return;
    };

    let sections = known_sections();
    let section_names: Vec<&str> = sections.keys().copied().collect();

    for (key, value) in root {
        let Some(fields) = sections.get(key.as_str()) else {
            diagnostics.push(unknown_field(key.clone(), key, &section_names));
            continue;
        };
        let Some(table) = value.as_object() else {
            continue;
        };
        for field in table.keys() {
            if !fields.contains(&field.as_str()) {
                diagnostics.push(unknown_field(format!("{key}.{field}"), field, fields));
            }
        }
    }
}

fn unknown_field(path: String, key: &str, candidates: &[&str]) -> Diagnostic {
    let message = match suggest(key, candidates, 3) {
        Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
        None => "unknown field".into(),
    };
    Diagnostic {
        severity: Severity::Warning,
        category: "unknown-field",
        path,
        message,
    }
}

fn check_semantics(config: &ChatcastConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.history.max_messages == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "history",
            path: "history.max_messages".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.server.host.trim().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "server",
            path: "server.host".into(),
            message: "host must not be empty".into(),
        });
    }

    if config.server.port == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "server",
            path: "server.port".into(),
            message: "port 0 binds a random port; overlays will not find it".into(),
        });
    }

    if !config.discord.has_token() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "discord",
            path: "discord.token".into(),
            message: "no bot token configured (set discord.token or DISCORD_BOT_TOKEN)".into(),
        });
    }

    if config.discord.watch_channels.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "discord",
            path: "discord.watch_channels".into(),
            message: "no channels watched yet; use /add in Discord".into(),
        });
    }

    if !config.fonts.dir.is_dir() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "fonts",
            path: "fonts.dir".into(),
            message: format!(
                "directory {} not found; overlays fall back to default fonts",
                config.fonts.dir.display()
            ),
        });
    }
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}
