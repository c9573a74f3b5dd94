//! Typed handles over single keys.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

use crate::error::StorageError;
use crate::store::{Origin, StorageEvent, Store};

/// Converts values to and from their stored string form.
pub trait Codec<T>: Send + Sync {
    /// Encodes a value. `Ok(None)` means "remove the key".
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encode`] or [`StorageError::Rejected`].
    fn encode(&self, key: &str, value: &T) -> Result<Option<String>, StorageError>;

    /// Decodes a stored string.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Decode`] if `raw` is not a valid value.
    fn decode(&self, key: &str, raw: &str) -> Result<T, StorageError>;
}

/// JSON codec. A value that serializes to `null` removes the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    fn encode(&self, key: &str, value: &T) -> Result<Option<String>, StorageError> {
        let raw = serde_json::to_string(value).map_err(|e| StorageError::encode(key, e))?;
        Ok((raw != "null").then_some(raw))
    }

    fn decode(&self, key: &str, raw: &str) -> Result<T, StorageError> {
        serde_json::from_str(raw).map_err(|e| StorageError::decode(key, e))
    }
}

/// Plain-text codec using `Display` and `FromStr`, for values stored
/// unquoted such as the theme name.
pub struct TextCodec<T>(PhantomData<fn() -> T>);

impl<T> TextCodec<T> {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TextCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TextCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TextCodec")
    }
}

impl<T> Codec<T> for TextCodec<T>
where
    T: fmt::Display + FromStr,
    T::Err: fmt::Display,
{
    fn encode(&self, _key: &str, value: &T) -> Result<Option<String>, StorageError> {
        Ok(Some(value.to_string()))
    }

    fn decode(&self, key: &str, raw: &str) -> Result<T, StorageError> {
        raw.parse().map_err(|e| StorageError::decode(key, e))
    }
}

/// JSON codec that also checks values against a predicate, both when
/// written and when read back.
pub struct ValidatedCodec<T> {
    validator: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> ValidatedCodec<T> {
    /// Creates a codec accepting values for which `validator` returns `true`.
    pub fn new(validator: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self { validator: Box::new(validator) }
    }
}

impl<T> fmt::Debug for ValidatedCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidatedCodec")
    }
}

impl<T: Serialize + DeserializeOwned> Codec<T> for ValidatedCodec<T> {
    fn encode(&self, key: &str, value: &T) -> Result<Option<String>, StorageError> {
        if !(self.validator)(value) {
            return Err(StorageError::rejected(key, "invalid value"));
        }
        JsonCodec.encode(key, value)
    }

    fn decode(&self, key: &str, raw: &str) -> Result<T, StorageError> {
        let value: T = JsonCodec.decode(key, raw)?;
        if (self.validator)(&value) {
            Ok(value)
        } else {
            Err(StorageError::decode(key, "stored value failed validation"))
        }
    }
}

/// A typed value bound to one key of a [`Store`].
///
/// The handle keeps the current value in memory. Unreadable stored values
/// fall back to the default with a warning. With cross-instance sync on
/// (the default), changes made through other handles on the same store are
/// applied on the next read.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use am_storage::{Store, StoredValue};
///
/// let store = Arc::new(Store::in_memory());
/// let open = StoredValue::new(Arc::clone(&store), "sidebar_open", true);
/// let other = StoredValue::new(Arc::clone(&store), "sidebar_open", true);
///
/// open.set(false).unwrap();
/// assert!(!other.get());
/// open.update(|v| !v).unwrap();
/// assert!(other.get());
/// ```
pub struct StoredValue<T, C = JsonCodec> {
    store: Arc<Store>,
    key: String,
    default: T,
    codec: C,
    current: RwLock<T>,
    origin: Origin,
    events: Option<Mutex<broadcast::Receiver<StorageEvent>>>,
}

impl<T, C> fmt::Debug for StoredValue<T, C>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredValue")
            .field("key", &self.key)
            .field("current", &*self.current.read())
            .field("synced", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> StoredValue<T, JsonCodec>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Binds `key` with JSON encoding.
    pub fn new(store: Arc<Store>, key: impl Into<String>, default: T) -> Self {
        Self::with_codec(store, key, default, JsonCodec)
    }
}

impl<T, C> StoredValue<T, C>
where
    T: Clone + Send + Sync,
    C: Codec<T>,
{
    /// Binds `key` with a custom codec.
    pub fn with_codec(store: Arc<Store>, key: impl Into<String>, default: T, codec: C) -> Self {
        let key = key.into();
        let events = Some(Mutex::new(store.subscribe()));
        let initial = read_or_default(&store, &codec, &key, &default);
        Self {
            store,
            key,
            default,
            codec,
            current: RwLock::new(initial),
            origin: Origin::next(),
            events,
        }
    }

    /// Turns following changes from other handles on or off.
    #[must_use]
    pub fn sync_across_instances(mut self, enabled: bool) -> Self {
        self.events = enabled.then(|| Mutex::new(self.store.subscribe()));
        self
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the default value.
    #[must_use]
    pub const fn default_value(&self) -> &T {
        &self.default
    }

    /// Returns the current value.
    pub fn get(&self) -> T {
        self.apply_external_changes();
        self.current.read().clone()
    }

    /// Stores a new value. A value the codec encodes as "remove" deletes
    /// the key and resets the handle to its default.
    ///
    /// # Errors
    ///
    /// Returns the codec or store error; the current value is unchanged.
    pub fn set(&self, value: T) -> Result<(), StorageError> {
        let encoded = self.codec.encode(&self.key, &value).inspect_err(|err| {
            warn!(key = %self.key, error = %err, "cannot store value");
        })?;
        match encoded {
            Some(raw) => {
                self.store.set_from(&self.key, raw, self.origin)?;
                *self.current.write() = value;
            }
            None => {
                self.store.remove_from(&self.key, self.origin)?;
                *self.current.write() = self.default.clone();
            }
        }
        Ok(())
    }

    /// Replaces the value with `f(current)`.
    ///
    /// # Errors
    ///
    /// See [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<(), StorageError> {
        let next = f(&self.get());
        self.set(next)
    }

    /// Removes the key and resets to the default value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the store cannot be written.
    pub fn remove(&self) -> Result<(), StorageError> {
        self.store.remove_from(&self.key, self.origin)?;
        *self.current.write() = self.default.clone();
        Ok(())
    }

    /// Re-reads the value from the store.
    pub fn refresh(&self) {
        *self.current.write() = read_or_default(&self.store, &self.codec, &self.key, &self.default);
    }

    fn apply_external_changes(&self) {
        let Some(events) = &self.events else { return };
        let mut events = events.lock();
        loop {
            match events.try_recv() {
                Ok(event) if event.origin == self.origin => {}
                Ok(event) => match event.key.as_deref() {
                    None => *self.current.write() = self.default.clone(),
                    Some(key) if key == self.key => {
                        let value = event.new_value.map_or_else(
                            || self.default.clone(),
                            |raw| decode_or_default(&self.codec, &self.key, &raw, &self.default),
                        );
                        *self.current.write() = value;
                    }
                    Some(_) => {}
                },
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(key = %self.key, skipped, "missed storage events, re-reading");
                    self.refresh();
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

fn read_or_default<T: Clone, C: Codec<T>>(store: &Store, codec: &C, key: &str, default: &T) -> T {
    store
        .get(key)
        .map_or_else(|| default.clone(), |raw| decode_or_default(codec, key, &raw, default))
}

fn decode_or_default<T: Clone, C: Codec<T>>(codec: &C, key: &str, raw: &str, default: &T) -> T {
    codec.decode(key, raw).unwrap_or_else(|err| {
        warn!(key, error = %err, "falling back to default value");
        default.clone()
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Valuation {
        label: String,
        cost: f64,
        history: Vec<f64>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
    }

    fn store() -> Arc<Store> {
        Arc::new(Store::in_memory())
    }

    #[test]
    fn test_default_when_missing() {
        let value = StoredValue::new(store(), "theme", "light".to_owned());
        assert_eq!(value.get(), "light");
    }

    #[test]
    fn test_set_persists_json() {
        let store = store();
        let value = StoredValue::new(Arc::clone(&store), "user", Profile { name: "a".into(), visits: 0 });
        value.set(Profile { name: "admin".into(), visits: 3 }).unwrap();
        assert_eq!(store.get("user").as_deref(), Some(r#"{"name":"admin","visits":3}"#));
    }

    #[test]
    fn test_unreadable_value_falls_back_to_default() {
        let store = store();
        store.set("visits", "not json").unwrap();
        let value = StoredValue::new(Arc::clone(&store), "visits", 7_u32);
        assert_eq!(value.get(), 7);
    }

    #[test]
    fn test_setting_null_removes_key() {
        let store = store();
        let value: StoredValue<Option<String>> = StoredValue::new(Arc::clone(&store), "refresh_token", None);
        value.set(Some("r1".into())).unwrap();
        assert!(store.contains("refresh_token"));
        value.set(None).unwrap();
        assert!(!store.contains("refresh_token"));
        assert_eq!(value.get(), None);
    }

    #[test]
    fn test_remove_resets_to_default() {
        let store = store();
        let value = StoredValue::new(Arc::clone(&store), "count", 1_i32);
        value.set(5).unwrap();
        value.remove().unwrap();
        assert_eq!(value.get(), 1);
        assert!(!store.contains("count"));
    }

    #[test]
    fn test_update_uses_current_value() {
        let value = StoredValue::new(store(), "count", 1_i32);
        value.update(|v| v + 41).unwrap();
        assert_eq!(value.get(), 42);
    }

    #[test]
    fn test_sync_between_handles() {
        let store = store();
        let a = StoredValue::new(Arc::clone(&store), "count", 0_i32);
        let b = StoredValue::new(Arc::clone(&store), "count", 0_i32);
        a.set(3).unwrap();
        assert_eq!(b.get(), 3);
        a.remove().unwrap();
        assert_eq!(b.get(), 0);
    }

    #[test]
    fn test_sync_disabled_keeps_local_value() {
        let store = store();
        let a = StoredValue::new(Arc::clone(&store), "count", 0_i32);
        let b = StoredValue::new(Arc::clone(&store), "count", 0_i32).sync_across_instances(false);
        a.set(3).unwrap();
        assert_eq!(b.get(), 0);
        b.refresh();
        assert_eq!(b.get(), 3);
    }

    #[test]
    fn test_store_clear_resets_handles() {
        let store = store();
        let a = StoredValue::new(Arc::clone(&store), "count", 0_i32);
        a.set(9).unwrap();
        store.clear().unwrap();
        assert_eq!(a.get(), 0);
    }

    #[test]
    fn test_text_codec_stores_unquoted() {
        let store = store();
        let value = StoredValue::with_codec(Arc::clone(&store), "limit", 10_u32, TextCodec::new());
        value.set(25).unwrap();
        assert_eq!(store.get("limit").as_deref(), Some("25"));
    }

    #[test]
    fn test_validated_codec_rejects_writes_and_reads() {
        let store = store();
        store.set("page_size", "7").unwrap();
        let allowed = [5_u32, 10, 25, 50, 100];
        let value = StoredValue::with_codec(
            Arc::clone(&store),
            "page_size",
            10_u32,
            ValidatedCodec::new(move |v: &u32| allowed.contains(v)),
        );
        assert_eq!(value.get(), 10);

        let err = value.set(13).unwrap_err();
        assert!(matches!(err, StorageError::Rejected { .. }));
        assert_eq!(store.get("page_size").as_deref(), Some("7"));

        value.set(25).unwrap();
        assert_eq!(value.get(), 25);
    }

    #[test]
    fn test_floats_survive_file_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("storage.json")).unwrap();
        let history: Vec<f64> = (1..5000_u32)
            .map(|i| f64::from(i) * 1.618_033_988_749_895 + 1.0 / f64::from(i + 2))
            .chain([1451.186_815_982_315_5, 1981.208_767_020_424_1, 0.1 + 0.2, f64::MIN_POSITIVE])
            .collect();
        let written = Valuation { label: "Ноутбук".to_owned(), cost: 89_990.99, history };

        let store = Arc::new(Store::open(path.clone()).unwrap());
        StoredValue::new(store, "valuation", Valuation::default()).set(written.clone()).unwrap();

        let reopened = Arc::new(Store::open(path).unwrap());
        let read = StoredValue::new(reopened, "valuation", Valuation::default()).get();
        assert_eq!(read, written);
    }
}
