//! Integration tests for on-disk projects: `foundry.toml` selects entry
//! points and tuning, and the configured cache directory persists artifacts
//! between runs.

use foundry_cache::{cached_transform, DiskCache};
use foundry_conformance::{config_from_toml, fan_out, memory_call};
use foundry_config::{load_config, TransformerConfig};
use foundry_device::load_device;
use foundry_transform::{CountingEvents, TransformationContext};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PROJECT: &str = r#"
[project]
name = "kernels"
version = "0.1.0"

[transform]
entry_point_prefixes = ["Ns.K::R"]
device = "Nexys A7-100T"

[transform.parallelism]
"Ns.K::Worker" = 3

[cache]
enabled = true
directory = "build/cache"
"#;

fn write_project(dir: &Path, text: &str) {
    fs::write(dir.join("foundry.toml"), text).unwrap();
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn project_file_drives_the_transformation() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), PROJECT);

    let project = load_config(dir.path()).unwrap();
    assert_eq!(project.project.name, "kernels");
    let config = TransformerConfig::try_from(&project).unwrap();
    let device = load_device(&config.device).unwrap();
    let tree = fan_out(3);
    let context = TransformationContext::new(&tree, &config, &device).unwrap();
    assert_eq!(context.entry_points(), ["Ns.K::Run"]);

    let result = foundry_conformance::run_on(&tree, &config, &device).unwrap();
    let replicas = result
        .members
        .iter()
        .filter(|m| m.member == "Ns.K::Worker")
        .count();
    assert_eq!(replicas, 3);
}

#[test]
fn invalid_degree_is_rejected_at_load() {
    let text = PROJECT.replace("\"Ns.K::Worker\" = 3", "\"Ns.K::Worker\" = 0");
    assert!(config_from_toml(&text).is_err());
}

#[test]
fn missing_project_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(load_config(dir.path()).is_err());
}

// ---------------------------------------------------------------------------
// Cache directory
// ---------------------------------------------------------------------------

#[test]
fn configured_cache_directory_holds_artifacts() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), PROJECT);
    let project = load_config(dir.path()).unwrap();
    let config = TransformerConfig::try_from(&project).unwrap();
    let device = load_device(&config.device).unwrap();
    let tree = fan_out(3);
    let context = TransformationContext::new(&tree, &config, &device).unwrap();

    let cache = DiskCache::from_config(dir.path(), &project.cache).unwrap();
    assert_eq!(cache.dir(), dir.path().join("build/cache"));
    let outcome = cached_transform(&cache, &context, &CountingEvents::new()).unwrap();
    assert!(!outcome.is_hit());

    let manifest = cache.manifest().unwrap();
    let entry = &manifest.entries[&context.id().to_string()];
    assert_eq!(entry.member_ids.get("Ns.K::Run"), Some(&0));

    let again = DiskCache::from_config(dir.path(), &project.cache).unwrap();
    let events = CountingEvents::new();
    assert!(cached_transform(&again, &context, &events).unwrap().is_hit());
    assert_eq!(events.members(), 0);
}

#[test]
fn disabled_cache_is_never_opened() {
    let dir = TempDir::new().unwrap();
    let text = PROJECT.replace("enabled = true", "enabled = false");
    write_project(dir.path(), &text);
    let project = load_config(dir.path()).unwrap();
    assert!(DiskCache::from_config(dir.path(), &project.cache).is_none());
}

#[test]
fn corrupt_cache_entry_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let config = config_from_toml(
        r#"
[project]
name = "kernels"

[transform]
entry_points = ["Ns.M::Run"]
"#,
    )
    .unwrap();
    let device = load_device(&config.device).unwrap();
    let tree = memory_call();
    let context = TransformationContext::new(&tree, &config, &device).unwrap();
    let cache = DiskCache::new(dir.path());
    cached_transform(&cache, &context, &CountingEvents::new()).unwrap();

    let path = dir
        .path()
        .join("artifacts")
        .join(format!("{}.bin", context.id()));
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    let events = CountingEvents::new();
    let outcome = cached_transform(&cache, &context, &events).unwrap();
    assert!(!outcome.is_hit());
    assert!(events.members() > 0);
}
