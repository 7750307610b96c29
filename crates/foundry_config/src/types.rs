//! Configuration types deserialized from `foundry.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `foundry.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Settings that shape the generated hardware.
    #[serde(default)]
    pub transform: TransformSection,
    /// Transformation cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Core project metadata.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    #[serde(default)]
    pub version: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// The `[transform]` table.
#[derive(Debug, Default, Deserialize)]
pub struct TransformSection {
    /// Entry points selected by exact full name (`"Ns.Type::Method"`).
    #[serde(default)]
    pub entry_points: Vec<String>,
    /// Entry points selected by full-name prefix.
    #[serde(default)]
    pub entry_point_prefixes: Vec<String>,
    /// Target device name; defaults to [`DEFAULT_DEVICE`](crate::DEFAULT_DEVICE).
    #[serde(default)]
    pub device: Option<String>,
    /// Static lengths for array holders that cannot be inferred.
    #[serde(default)]
    pub array_lengths: BTreeMap<String, u32>,
    /// Degree of parallelism per invoked member.
    #[serde(default)]
    pub parallelism: BTreeMap<String, u32>,
}

/// The `[cache]` table.
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Whether transformation results are cached.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache directory, relative to the project directory.
    #[serde(default = "default_cache_directory")]
    pub directory: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            directory: default_cache_directory(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_directory() -> String {
    ".foundry-cache".to_string()
}
