//! Key-value persistence for monitor state
//!
//! The monitor persists its registry and settings through the
//! [`KeyValueStore`] seam. `put_many` is the atomic commit point: either
//! every key lands or none does, so an interrupted save leaves the
//! previously persisted snapshot intact.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// String-keyed persistence with atomic multi-key commit.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores every entry as a single atomic commit.
    fn put_many(&self, entries: &[(String, String)]) -> io::Result<()>;

    /// Removes a single key. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> io::Result<()>;

    /// Removes all stored state.
    fn clear(&self) -> io::Result<()>;
}

/// Volatile in-memory store for tests and embedders that handle
/// durability themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn put_many(&self, entries: &[(String, String)]) -> io::Result<()> {
        let mut map = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (key, value) in entries {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
        Ok(())
    }
}

/// File-backed store holding all keys in one JSON object.
///
/// Writes go to a temporary sibling file first and are moved into place
/// with a rename, so a crash mid-write cannot corrupt the snapshot. An
/// unreadable or corrupt file degrades to an empty store with a logged
/// warning rather than an error.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading the current snapshot if one
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let cache = match Self::load(&path) {
            Ok(map) => map,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                tracing::warn!(
                    "corrupt state file {}, starting from an empty store: {}",
                    path.display(),
                    err
                );
                HashMap::new()
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> io::Result<HashMap<String, String>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn flush(&self, map: &HashMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn put_many(&self, entries: &[(String, String)]) -> io::Result<()> {
        let mut map = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = map.clone();
        for (key, value) in entries {
            next.insert(key.clone(), value.clone());
        }
        self.flush(&next)?;
        *map = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut map = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !map.contains_key(key) {
            return Ok(());
        }
        let mut next = map.clone();
        next.remove(key);
        self.flush(&next)?;
        *map = next;
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut map = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.flush(&HashMap::new())?;
        map.clear();
        Ok(())
    }
}
