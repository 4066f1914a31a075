//! Persisted record of what was indexed, and at which fingerprint

use super::scanner::Fingerprint;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fingerprint of a document at the time it was last indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub mtime: f64,
    pub size: u64,
    pub id: String,
}

impl TrackingRecord {
    pub fn new(fingerprint: Fingerprint, id: impl Into<String>) -> Self {
        Self {
            mtime: fingerprint.mtime,
            size: fingerprint.size,
            id: id.into(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            mtime: self.mtime,
            size: self.size,
        }
    }
}

/// Canonical relative path to tracking record, ordered for stable output
pub type TrackingMap = BTreeMap<String, TrackingRecord>;

/// JSON file holding the [`TrackingMap`]
#[derive(Debug, Clone)]
pub struct TrackingStore {
    path: PathBuf,
}

impl TrackingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the map. A missing or unparsable file is treated as empty.
    pub fn load(&self) -> TrackingMap {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return TrackingMap::new(),
            Err(e) => {
                tracing::warn!("Cannot read tracking file {}: {}", self.path.display(), e);
                return TrackingMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    "Ignoring corrupt tracking file {}: {}",
                    self.path.display(),
                    e
                );
                TrackingMap::new()
            }
        }
    }

    /// Overwrite the file with `map`
    pub fn save(&self, map: &TrackingMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
