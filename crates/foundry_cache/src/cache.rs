//! Artifact caches and the cache-aware transformation entry point.

use crate::error::CacheError;
use crate::manifest::{CacheManifest, ManifestEntry};
use crate::store::ArtifactStore;
use foundry_common::ContentHash;
use foundry_config::CacheConfig;
use foundry_transform::{
    transform_with_events, HardwareArtifact, TransformError, TransformationContext,
    TransformationEvents,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Version string written into every cache file.
const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A store of finished artifacts keyed by context Id.
pub trait ArtifactCache: Send + Sync {
    /// Returns the artifact stored under `key`, or `None` on a miss.
    fn load(&self, key: &ContentHash) -> Option<HardwareArtifact>;

    /// Stores `artifact` under `key`, replacing any previous entry.
    fn store(&self, key: &ContentHash, artifact: &HardwareArtifact) -> Result<(), CacheError>;
}

/// Artifacts persisted below a directory, one checked file each.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    store: ArtifactStore,
}

impl DiskCache {
    /// Creates a cache rooted at `dir`. Nothing is created until the first
    /// store.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            store: ArtifactStore::new(dir),
        }
    }

    /// Creates the cache a project configures, or `None` if caching is
    /// disabled. The directory is resolved against `project_dir`.
    pub fn from_config(project_dir: &Path, config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(&project_dir.join(&config.directory)))
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The manifest describing the stored artifacts, if one was written by
    /// this version.
    pub fn manifest(&self) -> Option<CacheManifest> {
        CacheManifest::load(&self.dir).filter(|m| m.is_compatible(TOOL_VERSION))
    }
}

impl ArtifactCache for DiskCache {
    fn load(&self, key: &ContentHash) -> Option<HardwareArtifact> {
        let bytes = self.store.read(&key.to_string(), TOOL_VERSION)?;
        let (artifact, _): (HardwareArtifact, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).ok()?;
        Some(artifact)
    }

    fn store(&self, key: &ContentHash, artifact: &HardwareArtifact) -> Result<(), CacheError> {
        let bytes = bincode::serde::encode_to_vec(artifact, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
        let name = key.to_string();
        self.store.write(&name, &bytes, TOOL_VERSION)?;

        let mut manifest = self
            .manifest()
            .unwrap_or_else(|| CacheManifest::new(TOOL_VERSION));
        manifest.entries.insert(
            name,
            ManifestEntry {
                member_ids: artifact.member_ids.clone(),
                warnings: artifact.warnings.len(),
                has_constraints: artifact.constraints.is_some(),
            },
        );
        manifest.save(&self.dir)
    }
}

/// Artifacts held in memory for the lifetime of the cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<BTreeMap<ContentHash, HardwareArtifact>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<ContentHash, HardwareArtifact>> {
        // Inserts are single map operations; a panicking holder leaves the map whole.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactCache for MemoryCache {
    fn load(&self, key: &ContentHash) -> Option<HardwareArtifact> {
        self.entries().get(key).cloned()
    }

    fn store(&self, key: &ContentHash, artifact: &HardwareArtifact) -> Result<(), CacheError> {
        self.entries().insert(*key, artifact.clone());
        Ok(())
    }
}

/// The artifact of a cache-aware run and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Returned unchanged from the cache; nothing was transformed.
    Hit(HardwareArtifact),
    /// Freshly transformed.
    Miss(HardwareArtifact),
}

impl CacheOutcome {
    /// The artifact.
    pub fn artifact(&self) -> &HardwareArtifact {
        match self {
            CacheOutcome::Hit(a) | CacheOutcome::Miss(a) => a,
        }
    }

    /// Consumes the outcome, returning the artifact.
    pub fn into_artifact(self) -> HardwareArtifact {
        match self {
            CacheOutcome::Hit(a) | CacheOutcome::Miss(a) => a,
        }
    }

    /// Returns `true` for a cache hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheOutcome::Hit(_))
    }
}

/// Transforms the context, consulting `cache` first.
///
/// On a hit the stored artifact is returned and no transformation event
/// fires. On a miss the artifact is transformed and stored; a failed store
/// is logged and does not fail the run. A failed transformation leaves the
/// cache untouched.
pub fn cached_transform(
    cache: &dyn ArtifactCache,
    context: &TransformationContext<'_>,
    events: &dyn TransformationEvents,
) -> Result<CacheOutcome, TransformError> {
    let key = context.id();
    if let Some(artifact) = cache.load(&key) {
        info!(id = %key, "cache hit");
        return Ok(CacheOutcome::Hit(artifact));
    }
    info!(id = %key, "cache miss");

    let artifact = transform_with_events(context, events)?;
    match cache.store(&key, &artifact) {
        Ok(()) => debug!(id = %key, "artifact cached"),
        Err(e) => warn!(id = %key, error = %e, "failed to cache artifact"),
    }
    Ok(CacheOutcome::Miss(artifact))
}
