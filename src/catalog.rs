// The built-in sound catalog, plus loading a replacement catalog from a
// JSON file so a classroom can swap in its own sounds.
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tempo::Tempo;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(pub u32);

// One entry of the sound catalog. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoundDef {
    pub id: SoundId,
    pub label: String,
    pub color: String, // "#RRGGBB"
    pub source: String,
    #[serde(default)]
    pub default_tempo: Tempo,
    #[serde(default = "default_interval_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_category() -> String {
    "misc".to_string()
}

impl SoundDef {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    // Parse `color` into RGB; malformed colors come back as None and the
    // TUI falls back to a neutral shade.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some((channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog is empty")]
    Empty,
    #[error("duplicate sound id {0}")]
    DuplicateId(u32),
    #[error("sound {0} has a zero base interval")]
    ZeroInterval(u32),
    #[error("sound {0} has no source")]
    MissingSource(u32),
}

const SNARE: &str = "/data/sounds/drum/snare_drum/tr909-snare-drum-241413.mp3";
const CLAP: &str = "data/sounds/clap/tr808-clap-241405.mp3";

fn entry(id: u32, label: &str, color: &str, source: &str, interval_ms: u64, category: &str) -> SoundDef {
    SoundDef {
        id: SoundId(id),
        label: label.to_string(),
        color: color.to_string(),
        source: source.to_string(),
        default_tempo: Tempo::NORMAL,
        base_interval_ms: interval_ms,
        category: category.to_string(),
    }
}

// The catalog shipped with the app. Instruments without a dedicated
// recording yet reuse the snare.
pub fn builtin() -> Vec<SoundDef> {
    vec![
        entry(1, "🥁 Drums", "#FFB6C1", SNARE, 500, "percussion"),
        entry(6, "👏 Clap", "#FFA07A", CLAP, 750, "percussion"),
        entry(2, "🎹 Piano", "#98FB98", SNARE, 1000, "melody"),
        entry(3, "🎸 Guitar", "#87CEEB", SNARE, 1000, "melody"),
        entry(4, "🎺 Trumpet", "#DDA0DD", SNARE, 1500, "brass"),
        entry(5, "🎻 Violin", "#F0E68C", SNARE, 2000, "strings"),
    ]
}

pub fn parse(json: &str) -> Result<Vec<SoundDef>, CatalogError> {
    let sounds: Vec<SoundDef> = serde_json::from_str(json)?;
    validate(&sounds)?;
    Ok(sounds)
}

// Load the catalog from `path`, or the built-in one when no path is given.
pub fn load(path: Option<&Path>) -> Result<Vec<SoundDef>, CatalogError> {
    let Some(path) = path else {
        return Ok(builtin());
    };
    let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse(&json)
}

fn validate(sounds: &[SoundDef]) -> Result<(), CatalogError> {
    if sounds.is_empty() {
        return Err(CatalogError::Empty);
    }
    let mut seen = HashSet::new();
    for sound in sounds {
        if !seen.insert(sound.id) {
            return Err(CatalogError::DuplicateId(sound.id.0));
        }
        if sound.base_interval_ms == 0 {
            return Err(CatalogError::ZeroInterval(sound.id.0));
        }
        if sound.source.trim().is_empty() {
            return Err(CatalogError::MissingSource(sound.id.0));
        }
    }
    Ok(())
}
