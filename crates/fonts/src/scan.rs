use std::path::Path;

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    chatcast_protocol::FontAsset,
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

/// Font container formats overlays know how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    TrueType,
    OpenType,
    Woff,
    Woff2,
}

impl FontKind {
    /// Detect the kind from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "ttf" => Some(Self::TrueType),
            "otf" => Some(Self::OpenType),
            "woff" => Some(Self::Woff),
            "woff2" => Some(Self::Woff2),
            _ => None,
        }
    }

    /// CSS `@font-face` `format()` hint.
    pub fn css_format(self) -> &'static str {
        match self {
            Self::TrueType => "truetype",
            Self::OpenType => "opentype",
            Self::Woff => "woff",
            Self::Woff2 => "woff2",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::TrueType => "font/ttf",
            Self::OpenType => "font/otf",
            Self::Woff => "font/woff",
            Self::Woff2 => "font/woff2",
        }
    }
}

/// Load every supported font in `dir`, sorted by file name.
///
/// A missing directory is not an error: overlays fall back to their
/// default fonts. Files that cannot be read are skipped.
pub fn load_fonts(dir: &Path) -> Result<Vec<FontAsset>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "font directory not found");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<(String, FontKind)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let kind = FontKind::from_file_name(&name)?;
            Some((name, kind))
        })
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let mut fonts = Vec::with_capacity(candidates.len());
    for (name, kind) in candidates {
        let path = dir.join(&name);
        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!(font = %name, bytes = bytes.len(), "loaded font");
                fonts.push(FontAsset {
                    name,
                    base64_data: STANDARD.encode(&bytes),
                    format: kind.css_format().into(),
                    mime_type: kind.mime_type().into(),
                });
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable font");
            },
        }
    }

    if fonts.is_empty() {
        info!(dir = %dir.display(), "no custom fonts found, overlays use default fonts");
    } else {
        let names: Vec<&str> = fonts.iter().map(|f| f.name.as_str()).collect();
        info!(fonts = %names.join(", "), "custom fonts available");
    }
    Ok(fonts)
}
