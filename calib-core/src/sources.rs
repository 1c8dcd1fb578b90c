//! # Sources Module
//!
//! Preset calibration sources: named lists of known gamma energies that can
//! be dropped into the point table so only the channels need typing.
//!
//! The library file is JSON:
//!
//! ```json
//! { "sources": { "Cs-137": { "energies": [ { "value": 661.657, "description": "Cs-137 gamma" } ] } } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// A single known line of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLine {
    /// Energy in keV.
    pub value: f64,
    pub description: String,
}

/// All lines of one named source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePreset {
    pub energies: Vec<SourceLine>,
}

/// The whole preset file. A BTreeMap keeps the buttons in a stable, sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceLibrary {
    pub sources: BTreeMap<String, SourcePreset>,
}

const BUILTIN_JSON: &str = r#"{
  "sources": {
    "Ba-133": { "energies": [
      { "value": 80.998, "description": "Ba-133 81 keV" },
      { "value": 276.399, "description": "Ba-133 276 keV" },
      { "value": 302.851, "description": "Ba-133 303 keV" },
      { "value": 356.013, "description": "Ba-133 356 keV" },
      { "value": 383.849, "description": "Ba-133 384 keV" }
    ] },
    "Co-60": { "energies": [
      { "value": 1173.228, "description": "Co-60 1173 keV" },
      { "value": 1332.492, "description": "Co-60 1332 keV" }
    ] },
    "Cs-137": { "energies": [
      { "value": 661.657, "description": "Cs-137 662 keV" }
    ] },
    "Eu-152": { "energies": [
      { "value": 121.782, "description": "Eu-152 122 keV" },
      { "value": 244.697, "description": "Eu-152 245 keV" },
      { "value": 344.279, "description": "Eu-152 344 keV" },
      { "value": 778.904, "description": "Eu-152 779 keV" },
      { "value": 964.057, "description": "Eu-152 964 keV" },
      { "value": 1112.076, "description": "Eu-152 1112 keV" },
      { "value": 1408.013, "description": "Eu-152 1408 keV" }
    ] },
    "Na-22": { "energies": [
      { "value": 511.0, "description": "Na-22 annihilation" },
      { "value": 1274.537, "description": "Na-22 1275 keV" }
    ] }
  }
}"#;

/// Parsed once on first use.
static BUILTIN: Lazy<SourceLibrary> = Lazy::new(|| parse_builtin(BUILTIN_JSON));

/// Parses an embedded table; a broken one is logged and leaves the library empty.
fn parse_builtin(text: &str) -> SourceLibrary {
    match SourceLibrary::from_json(text) {
        Ok(library) => library,
        Err(e) => {
            warn!("[SOURCES] Built-in source table is malformed: {}", e);
            SourceLibrary::default()
        }
    }
}

impl SourceLibrary {
    /// The compiled-in library of common laboratory sources.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Parses a library from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a library file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let library = Self::from_json(&text)?;
        info!(
            "[SOURCES] Loaded {} sources from {}",
            library.sources.len(),
            path.display()
        );
        Ok(library)
    }

    /// Source names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&SourcePreset, SourceError> {
        self.sources
            .get(name)
            .ok_or_else(|| SourceError::UnknownSource(name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
