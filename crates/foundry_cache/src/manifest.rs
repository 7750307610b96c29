//! Human-readable index of the cached artifacts.
//!
//! Stored as `manifest.json` in the cache directory. The artifact files are
//! authoritative; the manifest only describes them.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the manifest file within the cache directory.
const MANIFEST_FILE: &str = "manifest.json";

/// Index of cached artifacts by context Id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Foundry version that wrote the cache.
    pub tool_version: String,
    /// One entry per stored artifact.
    pub entries: BTreeMap<String, ManifestEntry>,
}

/// What one cached artifact contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Entry points and aliases the artifact exposes.
    pub member_ids: BTreeMap<String, u32>,
    /// Number of warnings raised by the run.
    pub warnings: usize,
    /// Whether the artifact carries timing constraints.
    pub has_constraints: bool,
}

impl CacheManifest {
    /// Creates an empty manifest.
    pub fn new(tool_version: &str) -> Self {
        Self {
            tool_version: tool_version.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the manifest, returning `None` if it is missing or unreadable.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(cache_dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest, creating the cache directory if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| CacheError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let path = cache_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Returns `true` if the manifest was written by `tool_version`.
    pub fn is_compatible(&self, tool_version: &str) -> bool {
        self.tool_version == tool_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = CacheManifest::new("0.1.0");
        manifest.entries.insert(
            "abc".to_string(),
            ManifestEntry {
                member_ids: BTreeMap::from([("Ns.K::Run".to_string(), 0)]),
                warnings: 1,
                has_constraints: false,
            },
        );
        manifest.save(dir.path()).unwrap();
        let loaded = CacheManifest::load(dir.path()).unwrap();
        assert_eq!(loaded, manifest);
        assert!(loaded.is_compatible("0.1.0"));
        assert!(!loaded.is_compatible("0.2.0"));
    }

    #[test]
    fn corrupt_manifest_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "{ not json").unwrap();
        assert!(CacheManifest::load(dir.path()).is_none());
    }
}
