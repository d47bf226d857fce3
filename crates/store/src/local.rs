//! Local persistent key-value cache.
//!
//! Mirrors the browser localStorage contract the portal originally relied
//! on: synchronous string keys and JSON-serialized string values. The cache
//! is the durable offline fallback and the write-through target of every
//! successful remote operation. Multiple processes over the same directory
//! are not coordinated; the last writer wins.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use prepsync_common::{AppError, AppResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Synchronous string-keyed storage.
pub trait LocalCache: Send + Sync {
    /// Get the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> AppResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> AppResult<()>;

    /// Remove the value stored under `key`, if any.
    fn remove_item(&self, key: &str) -> AppResult<()>;
}

/// In-memory cache for tests and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryCache {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    /// Create an empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| AppError::Cache("cache lock poisoned".to_string()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| AppError::Cache("cache lock poisoned".to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| AppError::Cache("cache lock poisoned".to_string()))?;
        items.remove(key);
        Ok(())
    }
}

/// File-backed cache: one JSON file per well-known key under a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Create a file-backed cache rooted at `dir`, creating it if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::Cache(format!("failed to create cache dir: {e}")))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }
}

impl LocalCache for FileCache {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Cache(format!("failed to read {key}: {e}"))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        fs::write(self.path_for(key), value)
            .map_err(|e| AppError::Cache(format!("failed to write {key}: {e}")))
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Cache(format!("failed to remove {key}: {e}"))),
        }
    }
}

/// Read a JSON map stored under `key`, tolerating absence and corruption.
///
/// A missing entry, an unreadable cache, or a document that no longer
/// parses all come back as an empty map; the caller then re-applies
/// defaults, which is the read-through behavior the portal relies on.
pub fn read_json_map<T: DeserializeOwned>(cache: &dyn LocalCache, key: &str) -> HashMap<String, T> {
    match cache.get_item(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                debug!(key = %key, error = %e, "Discarding unparseable cache entry");
                HashMap::new()
            }
        },
        Ok(None) => HashMap::new(),
        Err(e) => {
            debug!(key = %key, error = %e, "Cache read failed, treating as empty");
            HashMap::new()
        }
    }
}

/// Serialize `map` and store it under `key`.
pub fn write_json_map<T: Serialize>(
    cache: &dyn LocalCache,
    key: &str,
    map: &HashMap<String, T>,
) -> AppResult<()> {
    let raw = serde_json::to_string(map)?;
    cache.set_item(key, &raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.get_item("k").unwrap().is_none());

        cache.set_item("k", "v").unwrap();
        assert_eq!(cache.get_item("k").unwrap().as_deref(), Some("v"));

        cache.remove_item("k").unwrap();
        assert!(cache.get_item("k").unwrap().is_none());
    }

    #[test]
    fn test_file_cache_round_trip() {
        let dir = std::env::temp_dir().join(format!("prepsync-test-{}", uuid::Uuid::new_v4()));
        let cache = FileCache::new(&dir).unwrap();

        assert!(cache.get_item("prepsync:profiles").unwrap().is_none());
        cache.set_item("prepsync:profiles", "{}").unwrap();
        assert_eq!(
            cache.get_item("prepsync:profiles").unwrap().as_deref(),
            Some("{}")
        );

        cache.remove_item("prepsync:profiles").unwrap();
        assert!(cache.get_item("prepsync:profiles").unwrap().is_none());
        // Removing a missing key is fine
        cache.remove_item("prepsync:profiles").unwrap();

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_cache_sanitizes_keys() {
        let dir = std::env::temp_dir().join(format!("prepsync-test-{}", uuid::Uuid::new_v4()));
        let cache = FileCache::new(&dir).unwrap();

        cache.set_item("ns:with/odd keys", "1").unwrap();
        assert_eq!(cache.get_item("ns:with/odd keys").unwrap().as_deref(), Some("1"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_json_map_tolerates_corruption() {
        let cache = MemoryCache::new();
        cache.set_item("k", "not json at all").unwrap();

        let map: HashMap<String, u32> = read_json_map(&cache, "k");
        assert!(map.is_empty());
    }

    #[test]
    fn test_json_map_round_trip() {
        let cache = MemoryCache::new();
        let mut map = HashMap::new();
        map.insert("a@x.com".to_string(), 7_u32);

        write_json_map(&cache, "k", &map).unwrap();
        let back: HashMap<String, u32> = read_json_map(&cache, "k");
        assert_eq!(back, map);
    }
}
