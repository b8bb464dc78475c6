//! Durable key-value storage for the persisted credential record.
//!
//! The session keeps three independent keys (`user`, `token`, `expiry`) in
//! whatever backend the application was configured with. Values are stored
//! as plain strings; nothing here validates or encrypts them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use keyring::Entry;
use thiserror::Error;
use tracing::{debug, warn};

/// Key holding the JSON-serialized `{username, email}` record
pub const USER_KEY: &str = "user";

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Key holding the session expiry as a decimal millisecond epoch
pub const EXPIRY_KEY: &str = "expiry";

/// Service name used for OS keychain entries
const KEYRING_SERVICE: &str = "spendboard";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access storage file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode storage file: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Durable string key-value medium backing the credential record.
///
/// Writes must be visible to every subsequent read, including reads from a
/// store reopened over the same medium.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

// ============================================================================
// JSON file backend
// ============================================================================

/// Store backed by a single JSON object file, rewritten on every mutation.
///
/// A mutation only takes effect in memory once the file write succeeded.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file reads as empty; an unreadable
    /// or corrupt one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::read_entries(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable storage file");
            BTreeMap::new()
        });
        debug!(path = %path.display(), keys = entries.len(), "Storage opened");

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.write_entries(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.write_entries(&updated)?;
        *entries = updated;
        Ok(())
    }
}

// ============================================================================
// OS keychain backend
// ============================================================================

/// Store that keeps each key as its own OS keychain entry: the macOS
/// Keychain, the Windows Credential Manager, or the Linux kernel keyring.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        store.set(TOKEN_KEY, "tok123").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok123"));

        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        // Removing a missing key is fine
        store.remove(TOKEN_KEY).unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStore::open(&path);
        store.set(TOKEN_KEY, "tok123").unwrap();
        store.set(EXPIRY_KEY, "1700000000000").unwrap();
        store.remove(EXPIRY_KEY).unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("tok123"));
        assert_eq!(reopened.get(EXPIRY_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("storage.json"));
        assert_eq!(store.get(USER_KEY).unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

        // The next write replaces the corrupt file
        store.set(TOKEN_KEY, "fresh").unwrap();
        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_file_store_failed_write_leaves_value_unset() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the parent directory should be makes every write fail
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let store = FileStore::open(blocker.join("storage.json"));
        assert!(store.set(TOKEN_KEY, "tok123").is_err());
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_failed_remove_keeps_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let store = FileStore::open(&path);
        store.set(TOKEN_KEY, "tok123").unwrap();

        // Replace the file with a directory so the rewrite fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.remove(TOKEN_KEY).is_err());
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("tok123"));
    }

    #[test]
    #[ignore = "needs an OS keychain"]
    fn test_keyring_store_round_trip() {
        let store = KeyringStore::with_service("spendboard-test");
        let key = "round-trip";
        store.remove(key).unwrap();
        assert_eq!(store.get(key).unwrap(), None);

        store.set(key, "tok123").unwrap();
        assert_eq!(store.get(key).unwrap().as_deref(), Some("tok123"));

        // A second handle over the same service sees the same entry
        let reopened = KeyringStore::with_service("spendboard-test");
        assert_eq!(reopened.get(key).unwrap().as_deref(), Some("tok123"));

        store.remove(key).unwrap();
        assert_eq!(reopened.get(key).unwrap(), None);
        // Removing a missing entry is fine
        store.remove(key).unwrap();
    }
}
