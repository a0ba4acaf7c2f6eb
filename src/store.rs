//! Durable key-value storage for the collection.
//!
//! The synchronizer persists its whole collection as one JSON string under a
//! single key. [`KeyValueStore`] is the seam: [`FileStore`] writes one file
//! per key under a directory, [`MemoryStore`] keeps everything in a map and is
//! what tests (and `--ephemeral` runs) use.
//!
//! Both stores can enforce a byte quota on the total size of their values.
//! Exceeding it is reported as [`StoreError::QuotaExceeded`] and leaves the
//! previous value in place.
//!
//! ## On-disk layout
//!
//! ```text
//! <dir>/
//! └── studio_collection.json    # one file per key
//! ```
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a crash mid-write never leaves a truncated collection behind.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: u64, quota: u64 },
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

fn check_quota(quota: Option<u64>, needed: u64) -> Result<(), StoreError> {
    match quota {
        Some(quota) if needed > quota => Err(StoreError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

// =========================================================================
// In-memory store
// =========================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once all values together exceed `bytes`.
    pub fn with_quota(bytes: u64) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        let others: u64 = values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len() as u64)
            .sum();
        check_quota(self.quota, others + value.len() as u64)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =========================================================================
// File-backed store
// =========================================================================

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Total bytes held by every key except `key`.
    fn usage_excluding(&self, key: &str) -> Result<u64, StoreError> {
        let skip = self.path_for(key);
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path == skip || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            total += fs::metadata(&path)?.len();
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        if self.quota.is_some() {
            check_quota(self.quota, self.usage_excluding(key)? + value.len() as u64)?;
        }
        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn memory_quota_rejects_and_keeps_old_value() {
        let store = MemoryStore::with_quota(8);
        store.set("k", "1234").unwrap();

        let err = store.set("k", "123456789").unwrap_err();
        assert!(err.is_quota());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1234"));

        // Replacing a value only counts the new size
        store.set("k", "12345678").unwrap();
    }

    #[test]
    fn memory_quota_counts_other_keys() {
        let store = MemoryStore::with_quota(10);
        store.set("a", "123456").unwrap();
        assert!(store.set("b", "12345").unwrap_err().is_quota());
        store.set("b", "1234").unwrap();
    }

    #[test]
    fn invalid_keys_rejected() {
        let store = MemoryStore::new();
        for key in ["", "../escape", ".hidden", "a/b", "spaces here"] {
            assert!(
                matches!(store.set(key, "v"), Err(StoreError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
        store.set("studio_collection", "v").unwrap();
        store.set("v1.backup-2", "v").unwrap();
    }

    #[test]
    fn file_store_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().join("nested/store"), None).unwrap();

        assert_eq!(store.get("collection").unwrap(), None);
        store.set("collection", "[1,2,3]").unwrap();
        assert_eq!(store.get("collection").unwrap().as_deref(), Some("[1,2,3]"));
        assert!(store.dir().join("collection.json").exists());
    }

    #[test]
    fn file_store_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        FileStore::open(tmp.path(), None)
            .unwrap()
            .set("k", "persisted")
            .unwrap();

        let reopened = FileStore::open(tmp.path(), None).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn file_store_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path(), None).unwrap();
        store.set("k", "v").unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["k.json"]);
    }

    #[test]
    fn file_store_quota() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path(), Some(16)).unwrap();

        store.set("a", "0123456789").unwrap();
        let err = store.set("b", "0123456789").unwrap_err();
        assert!(matches!(
            err,
            StoreError::QuotaExceeded {
                needed: 20,
                quota: 16
            }
        ));
        assert_eq!(store.get("b").unwrap(), None);

        // Overwriting "a" does not double-count it
        store.set("a", "0123456789abcdef").unwrap();
    }
}
