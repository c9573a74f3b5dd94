//! The backing key-value store.
//!
//! A [`Store`] maps string keys to string values. The durable variant keeps
//! them in one JSON object on disk and rewrites the whole file on every
//! change (temporary file, then rename). The in-memory variant plays the role
//! of session storage.
//!
//! Every change is broadcast as a [`StorageEvent`] so other handles on the
//! same store can follow it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use am_core::StorageConfig;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::StorageError;

const EVENT_CAPACITY: usize = 64;

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

/// Identifies the handle that made a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin(u64);

impl Origin {
    /// Allocates an origin distinct from every other in the process.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed))
    }

    /// Origin used for changes made directly on the store.
    pub const STORE: Self = Self(0);
}

/// A change to one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key; `None` when the whole store was cleared.
    pub key: Option<String>,
    /// New raw value; `None` when removed.
    pub new_value: Option<String>,
    /// Handle that made the change.
    pub origin: Origin,
}

#[derive(Debug)]
enum Backend {
    Memory,
    File(Utf8PathBuf),
}

/// String key-value store with change notifications.
///
/// # Examples
///
/// ```
/// use am_storage::Store;
///
/// let store = Store::in_memory();
/// store.set("theme", "dark").unwrap();
/// assert_eq!(store.get("theme").as_deref(), Some("dark"));
/// store.remove("theme").unwrap();
/// assert!(store.get("theme").is_none());
/// ```
#[derive(Debug)]
pub struct Store {
    backend: Backend,
    entries: RwLock<BTreeMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl Store {
    fn with_backend(backend: Backend, entries: BTreeMap<String, String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { backend, entries: RwLock::new(entries), events }
    }

    /// Creates an empty store that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(Backend::Memory, BTreeMap::new())
    }

    /// Opens a file-backed store, loading existing entries.
    ///
    /// A missing file yields an empty store. A corrupt file is logged and
    /// treated as empty; it is replaced on the next write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file exists but cannot be read.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(err @ StorageError::Corrupt { .. }) => {
                warn!(error = %err, "ignoring corrupt storage file");
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        debug!(path = %path, keys = entries.len(), "opened storage");
        Ok(Self::with_backend(Backend::File(path), entries))
    }

    /// Opens the store described by the configuration.
    ///
    /// # Errors
    ///
    /// See [`Store::open`].
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::open(config.path.clone())
    }

    /// Returns the backing file, if durable.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match &self.backend {
            Backend::File(path) => Some(path),
            Backend::Memory => None,
        }
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Returns all keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be written.
    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        self.set_from(key, value.into(), Origin::STORE)
    }

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.remove_from(key, Origin::STORE)
    }

    /// Removes every key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        {
            let mut entries = self.entries.write();
            entries.clear();
            self.persist(&entries)?;
        }
        self.emit(StorageEvent { key: None, new_value: None, origin: Origin::STORE });
        Ok(())
    }

    /// Re-reads the backing file, picking up changes written by other
    /// processes. Keys whose value changed are broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] or [`StorageError::Corrupt`].
    pub fn reload(&self) -> Result<(), StorageError> {
        let Backend::File(path) = &self.backend else { return Ok(()) };
        let fresh = read_entries(path)?;
        let changed: Vec<StorageEvent> = {
            let mut entries = self.entries.write();
            let keys: BTreeSet<&String> = entries.keys().chain(fresh.keys()).collect();
            let changed = keys
                .into_iter()
                .filter(|key| entries.get(*key) != fresh.get(*key))
                .map(|key| StorageEvent {
                    key: Some(key.clone()),
                    new_value: fresh.get(key).cloned(),
                    origin: Origin::STORE,
                })
                .collect();
            *entries = fresh;
            changed
        };
        debug!(changed = changed.len(), "reloaded storage");
        for event in changed {
            self.emit(event);
        }
        Ok(())
    }

    /// Subscribes to change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }

    pub(crate) fn set_from(&self, key: &str, value: String, origin: Origin) -> Result<(), StorageError> {
        {
            let mut entries = self.entries.write();
            let previous = entries.insert(key.to_owned(), value.clone());
            if let Err(err) = self.persist(&entries) {
                match previous {
                    Some(previous) => entries.insert(key.to_owned(), previous),
                    None => entries.remove(key),
                };
                return Err(err);
            }
        }
        self.emit(StorageEvent { key: Some(key.to_owned()), new_value: Some(value), origin });
        Ok(())
    }

    pub(crate) fn remove_from(&self, key: &str, origin: Origin) -> Result<(), StorageError> {
        {
            let mut entries = self.entries.write();
            let Some(previous) = entries.remove(key) else { return Ok(()) };
            if let Err(err) = self.persist(&entries) {
                entries.insert(key.to_owned(), previous);
                return Err(err);
            }
        }
        self.emit(StorageEvent { key: Some(key.to_owned()), new_value: None, origin });
        Ok(())
    }

    fn emit(&self, event: StorageEvent) {
        // No receivers is not an error.
        let _ = self.events.send(event);
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let Backend::File(path) = &self.backend else { return Ok(()) };
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(entries).map_err(|e| StorageError::encode("*", e))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn read_entries(path: &Utf8Path) -> Result<BTreeMap<String, String>, StorageError> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            path: path.to_owned(),
            reason: e.to_string(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/storage.json")).unwrap();
        (dir, path)
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let (_dir, path) = temp_store();
        let store = Store::open(path.clone()).unwrap();
        store.set("token", "abc").unwrap();
        store.set("theme", "dark").unwrap();
        store.remove("theme").unwrap();
        drop(store);

        let reopened = Store::open(path).unwrap();
        assert_eq!(reopened.get("token").as_deref(), Some("abc"));
        assert!(!reopened.contains("theme"));
        assert_eq!(reopened.keys(), vec!["token".to_owned()]);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let (_dir, path) = temp_store();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        let store = Store::open(path.clone()).unwrap();
        assert!(store.keys().is_empty());

        store.set("a", "1").unwrap();
        let reopened = Store::open(path).unwrap();
        assert_eq!(reopened.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn test_events_carry_origin() {
        let store = Store::in_memory();
        let mut events = store.subscribe();
        let origin = Origin::next();
        store.set_from("user", "{}".to_owned(), origin).unwrap();
        store.remove_from("user", origin).unwrap();
        store.remove_from("user", origin).unwrap();

        let first = events.try_recv().unwrap();
        assert_eq!(first.key.as_deref(), Some("user"));
        assert_eq!(first.origin, origin);
        let second = events.try_recv().unwrap();
        assert!(second.new_value.is_none());
        // Removing a missing key emits nothing.
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_clear_broadcasts_whole_store_event() {
        let store = Store::in_memory();
        store.set("a", "1").unwrap();
        let mut events = store.subscribe();
        store.clear().unwrap();
        assert!(store.keys().is_empty());
        assert_eq!(events.try_recv().unwrap().key, None);
    }

    #[test]
    fn test_reload_picks_up_external_writes() {
        let (_dir, path) = temp_store();
        let first = Store::open(path.clone()).unwrap();
        let second = Store::open(path).unwrap();
        let mut events = second.subscribe();

        first.set("sidebar_open", "false").unwrap();
        assert!(second.get("sidebar_open").is_none());

        second.reload().unwrap();
        assert_eq!(second.get("sidebar_open").as_deref(), Some("false"));
        let event = events.try_recv().unwrap();
        assert_eq!(event.key.as_deref(), Some("sidebar_open"));
        assert_eq!(event.new_value.as_deref(), Some("false"));
    }

    #[test]
    fn test_memory_store_has_no_path() {
        assert!(Store::in_memory().path().is_none());
        assert!(Origin::next() != Origin::next());
    }
}
