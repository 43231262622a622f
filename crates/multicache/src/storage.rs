//! Storage backends
//!
//! Every backend stores opaque strings under string keys. The facade keeps a
//! whole JSON-encoded bucket in one entry, so backends never see item keys.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use tracing::debug;

use crate::{CacheError, Result};

/// Raw key/value storage area
pub trait StorageArea: Send + Sync {
    /// Read the raw string stored under `key`
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Store a raw string under `key`
    fn set_raw(&self, key: &str, value: String) -> Result<()>;

    /// Remove the entry under `key`
    fn remove_raw(&self, key: &str);

    /// Remove every entry
    fn clear_all(&self);
}

/// Process-lifetime in-memory storage
///
/// One instance is meant to be created at startup and shared by every
/// facade through an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shareable instance
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of raw entries held
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl StorageArea for MemoryStorage {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: String) -> Result<()> {
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove_raw(&self, key: &str) {
        self.data.write().remove(key);
    }

    fn clear_all(&self) {
        self.data.write().clear();
    }
}

/// Session-lifetime storage with an optional byte quota
///
/// Writes that would push the total size of keys and values past the quota
/// fail with [`CacheError::Storage`], mirroring a full session store.
#[derive(Debug, Default)]
pub struct SessionStorage {
    data: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl SessionStorage {
    /// Create an unbounded session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session store limited to `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes used by keys and values
    pub fn used_bytes(&self) -> usize {
        self.data
            .read()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl StorageArea for SessionStorage {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    fn set_raw(&self, key: &str, value: String) -> Result<()> {
        let mut data = self.data.write();
        if let Some(quota) = self.quota_bytes {
            let others: usize = data
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(CacheError::storage(format!(
                    "quota of {} bytes exceeded while writing {} ({} bytes needed)",
                    quota, key, needed
                )));
            }
        }
        data.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_raw(&self, key: &str) {
        self.data.write().remove(key);
    }

    fn clear_all(&self) {
        self.data.write().clear();
    }
}

/// Durable file-backed storage
///
/// Each entry is one `.cache` file under the base directory.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    base_path: PathBuf,
}

impl DiskStorage {
    /// Create new disk storage with base path
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get file path for a key
    fn key_path(&self, key: &str) -> PathBuf {
        let mut safe_key = String::with_capacity(key.len());
        for c in key.chars() {
            match c {
                '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => {
                    safe_key.push_str(&format!("%{:02X}", c as u32));
                }
                _ => safe_key.push(c),
            }
        }
        self.base_path.join(format!("{}.cache", safe_key))
    }

    /// Ensure base directory exists
    fn ensure_base_dir(&self) -> Result<()> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).map_err(|e| {
                CacheError::storage(format!(
                    "failed to create {}: {}",
                    self.base_path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

impl StorageArea for DiskStorage {
    fn get_raw(&self, key: &str) -> Option<String> {
        let file_path = self.key_path(key);
        match fs::read_to_string(&file_path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                debug!("Failed to read {}: {}", file_path.display(), e);
                None
            }
        }
    }

    fn set_raw(&self, key: &str, value: String) -> Result<()> {
        self.ensure_base_dir()?;

        let file_path = self.key_path(key);
        fs::write(&file_path, value).map_err(|e| {
            CacheError::storage(format!("failed to write {}: {}", file_path.display(), e))
        })
    }

    fn remove_raw(&self, key: &str) {
        let file_path = self.key_path(key);
        if let Err(e) = fs::remove_file(&file_path) {
            if e.kind() != ErrorKind::NotFound {
                debug!("Failed to remove {}: {}", file_path.display(), e);
            }
        }
    }

    fn clear_all(&self) {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "cache") {
                let _ = fs::remove_file(&path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_memory_storage_basic_operations() {
        let storage = MemoryStorage::new();

        storage.set_raw("test_key", "{\"a\":1}".to_string()).unwrap();
        assert_eq!(storage.get_raw("test_key").as_deref(), Some("{\"a\":1}"));
        assert_eq!(storage.get_raw("nonexistent"), None);

        storage.remove_raw("test_key");
        assert_eq!(storage.get_raw("test_key"), None);

        storage.set_raw("a", "1".to_string()).unwrap();
        storage.set_raw("b", "2".to_string()).unwrap();
        assert_eq!(storage.len(), 2);
        storage.clear_all();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_shared_memory_storage_sees_writes() {
        let shared = MemoryStorage::shared();
        let other = Arc::clone(&shared);

        shared.set_raw("k", "v".to_string()).unwrap();
        assert_eq!(other.get_raw("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_session_storage_quota() {
        let storage = SessionStorage::with_quota(16);

        storage.set_raw("key", "small".to_string()).unwrap();
        let err = storage
            .set_raw("other", "much too large value".to_string())
            .unwrap_err();
        assert!(matches!(err, CacheError::Storage { .. }));
        assert_eq!(storage.get_raw("other"), None);

        // Overwriting an entry does not count its old size twice
        storage.set_raw("key", "bigger12".to_string()).unwrap();
        assert_eq!(storage.used_bytes(), 11);
    }

    #[test]
    fn test_disk_storage_basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(temp_dir.path().join("store"));

        assert_eq!(storage.get_raw("$p$-ns-home"), None);

        storage
            .set_raw("$p$-ns-home", "{\"city\":\"beijing\"}".to_string())
            .unwrap();
        assert_eq!(
            storage.get_raw("$p$-ns-home").as_deref(),
            Some("{\"city\":\"beijing\"}")
        );

        storage.remove_raw("$p$-ns-home");
        assert_eq!(storage.get_raw("$p$-ns-home"), None);
    }

    #[test]
    fn test_disk_storage_escapes_keys() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(temp_dir.path());

        storage.set_raw("a/b", "1".to_string()).unwrap();
        storage.set_raw("a%2Fb", "2".to_string()).unwrap();

        assert_eq!(storage.get_raw("a/b").as_deref(), Some("1"));
        assert_eq!(storage.get_raw("a%2Fb").as_deref(), Some("2"));
    }

    #[test]
    fn test_disk_storage_clear_all() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskStorage::new(temp_dir.path());

        storage.set_raw("one", "1".to_string()).unwrap();
        storage.set_raw("two", "2".to_string()).unwrap();
        fs::write(temp_dir.path().join("keep.txt"), "x").unwrap();

        storage.clear_all();

        assert_eq!(storage.get_raw("one"), None);
        assert_eq!(storage.get_raw("two"), None);
        assert!(temp_dir.path().join("keep.txt").exists());
    }
}
