//! Checked binary files, one per cached artifact.
//!
//! Every file starts with a little-endian header length, then a bincode
//! header holding magic bytes, the format version, the producing tool
//! version and a checksum of the payload.

use crate::error::CacheError;
use foundry_common::ContentHash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Magic bytes identifying a Foundry cache file.
const MAGIC: [u8; 4] = *b"FNDY";

/// Version of the file layout. Increment on breaking changes to the header
/// or payload encoding.
const FILE_FORMAT_VERSION: u32 = 1;

/// Subdirectory holding artifact files.
const SUBDIR: &str = "artifacts";

/// Extension of artifact files.
const EXT: &str = "bin";

/// Header prepended to every artifact file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHeader {
    /// Must be `b"FNDY"`.
    pub magic: [u8; 4],
    /// File layout version.
    pub format_version: u32,
    /// Foundry version that wrote the file.
    pub tool_version: String,
    /// Hash of the payload.
    pub checksum: ContentHash,
}

/// Reads and writes checked artifact files below a cache directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    cache_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `cache_dir`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// The file holding `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(SUBDIR).join(format!("{key}.{EXT}"))
    }

    /// Writes `data` under `key`.
    pub fn write(&self, key: &str, data: &[u8], tool_version: &str) -> Result<(), CacheError> {
        let dir = self.cache_dir.join(SUBDIR);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir,
            source: e,
        })?;

        let header = FileHeader {
            magic: MAGIC,
            format_version: FILE_FORMAT_VERSION,
            tool_version: tool_version.to_string(),
            checksum: ContentHash::from_bytes(data),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(data);

        let path = self.path(key);
        std::fs::write(&path, &output).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Reads the payload under `key`.
    ///
    /// Returns `None` if the file is missing or truncated, or if its magic,
    /// layout version, tool version or checksum does not match.
    pub fn read(&self, key: &str, tool_version: &str) -> Option<Vec<u8>> {
        let raw = std::fs::read(self.path(key)).ok()?;
        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }
        let (header, _): (FileHeader, usize) =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .ok()?;
        if header.magic != MAGIC
            || header.format_version != FILE_FORMAT_VERSION
            || header.tool_version != tool_version
        {
            return None;
        }
        let payload = &raw[4 + header_len..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return None;
        }
        Some(payload.to_vec())
    }

    /// Removes the file under `key`, if any.
    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io { path, source: e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write("k1", b"payload", "0.1.0").unwrap();
        assert_eq!(store.read("k1", "0.1.0").unwrap(), b"payload");
    }

    #[test]
    fn missing_key_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ArtifactStore::new(dir.path()).read("absent", "0.1.0").is_none());
    }

    #[test]
    fn other_tool_version_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write("k1", b"payload", "0.1.0").unwrap();
        assert!(store.read("k1", "0.2.0").is_none());
    }

    #[test]
    fn corrupted_payload_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write("k1", b"payload", "0.1.0").unwrap();
        let path = store.path("k1");
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        std::fs::write(&path, raw).unwrap();
        assert!(store.read("k1", "0.1.0").is_none());
    }

    #[test]
    fn truncated_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write("k1", b"payload", "0.1.0").unwrap();
        std::fs::write(store.path("k1"), [1u8, 0]).unwrap();
        assert!(store.read("k1", "0.1.0").is_none());
    }

    #[test]
    fn remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.remove("absent").unwrap();
        store.write("k1", b"x", "0.1.0").unwrap();
        store.remove("k1").unwrap();
        assert!(store.read("k1", "0.1.0").is_none());
    }
}
