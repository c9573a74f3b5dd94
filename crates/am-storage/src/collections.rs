//! Collection-shaped stored values: lists, recent items, and preferences.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;
use crate::keys;
use crate::store::Store;
use crate::value::StoredValue;

/// Default capacity of [`RecentItems`].
pub const DEFAULT_RECENT_ITEMS: usize = 10;

/// A stored list with element-level helpers.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use am_storage::{Store, StoredList};
///
/// let list = StoredList::new(Arc::new(Store::in_memory()), "favorite_warehouses");
/// list.push(3).unwrap();
/// list.push(5).unwrap();
/// list.remove_value(&3).unwrap();
/// assert_eq!(list.items(), vec![5]);
/// ```
#[derive(Debug)]
pub struct StoredList<T> {
    value: StoredValue<Vec<T>>,
}

impl<T> StoredList<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync,
{
    /// Binds `key`, defaulting to an empty list.
    pub fn new(store: Arc<Store>, key: impl Into<String>) -> Self {
        Self { value: StoredValue::new(store, key, Vec::new()) }
    }

    /// Returns a copy of the elements.
    pub fn items(&self) -> Vec<T> {
        self.value.get()
    }

    /// Replaces the whole list.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn set(&self, items: Vec<T>) -> Result<(), StorageError> {
        self.value.set(items)
    }

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn push(&self, item: T) -> Result<(), StorageError> {
        self.value.update(|items| {
            let mut items = items.clone();
            items.push(item);
            items
        })
    }

    /// Removes the element at `index`; out-of-range indexes change nothing.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn remove_at(&self, index: usize) -> Result<(), StorageError> {
        self.value.update(|items| {
            items
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, item)| item.clone())
                .collect()
        })
    }

    /// Removes every element equal to `value`.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn remove_value(&self, value: &T) -> Result<(), StorageError> {
        self.value.update(|items| items.iter().filter(|item| *item != value).cloned().collect())
    }

    /// Replaces the element at `index`; out-of-range indexes change nothing.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn update_at(&self, index: usize, value: T) -> Result<(), StorageError> {
        self.value.update(|items| {
            let mut items = items.clone();
            if let Some(slot) = items.get_mut(index) {
                *slot = value;
            }
            items
        })
    }

    /// Empties the list, keeping the key.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.value.set(Vec::new())
    }

    /// Removes the key entirely.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn remove(&self) -> Result<(), StorageError> {
        self.value.remove()
    }

    /// Returns `true` if some element equals `value`.
    pub fn contains(&self, value: &T) -> bool {
        self.value.get().contains(value)
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.value.get().len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.value.get().is_empty()
    }
}

type SameItem<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Most-recently-used list: newest first, no duplicates, capped length.
pub struct RecentItems<T> {
    value: StoredValue<Vec<T>>,
    max_items: usize,
    same: SameItem<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for RecentItems<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentItems")
            .field("value", &self.value)
            .field("max_items", &self.max_items)
            .finish_non_exhaustive()
    }
}

impl<T> RecentItems<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Binds `key`, treating equal values as the same item.
    pub fn new(store: Arc<Store>, key: impl Into<String>, max_items: usize) -> Self {
        Self::with_identity(store, key, max_items, |a: &T, b: &T| a == b)
    }
}

impl<T> RecentItems<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Binds `key`, using `same` to detect duplicates, e.g. by record id.
    pub fn with_identity(
        store: Arc<Store>,
        key: impl Into<String>,
        max_items: usize,
        same: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { value: StoredValue::new(store, key, Vec::new()), max_items, same: Box::new(same) }
    }

    /// Returns the items, newest first.
    pub fn items(&self) -> Vec<T> {
        self.value.get()
    }

    /// Moves `item` to the front, dropping older duplicates and overflow.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn add(&self, item: T) -> Result<(), StorageError> {
        self.value.update(|items| {
            std::iter::once(item.clone())
                .chain(items.iter().filter(|existing| !(self.same)(existing, &item)).cloned())
                .take(self.max_items)
                .collect()
        })
    }

    /// Removes `item`.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn remove(&self, item: &T) -> Result<(), StorageError> {
        self.value
            .update(|items| items.iter().filter(|existing| !(self.same)(existing, item)).cloned().collect())
    }

    /// Forgets every item.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.value.set(Vec::new())
    }
}

/// User preferences stored as one JSON object under `user_preferences`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use am_storage::{Preferences, Store};
///
/// let prefs = Preferences::new(Arc::new(Store::in_memory()), Default::default());
/// prefs.set("page_size", 25).unwrap();
/// assert_eq!(prefs.get::<u32>("page_size"), Some(25));
/// assert_eq!(prefs.get_or("language", "ru".to_owned()), "ru");
/// ```
#[derive(Debug)]
pub struct Preferences {
    value: StoredValue<BTreeMap<String, serde_json::Value>>,
}

impl Preferences {
    /// Binds the preferences key with the given defaults.
    pub fn new(store: Arc<Store>, defaults: BTreeMap<String, serde_json::Value>) -> Self {
        Self { value: StoredValue::new(store, keys::USER_PREFERENCES, defaults) }
    }

    /// Returns all preferences.
    pub fn all(&self) -> BTreeMap<String, serde_json::Value> {
        self.value.get()
    }

    /// Returns one preference decoded as `T`, or `None` if absent, null, or
    /// of another type.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.value
            .get()
            .remove(name)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Returns one preference or `fallback`.
    pub fn get_or<T: DeserializeOwned>(&self, name: &str, fallback: T) -> T {
        self.get(name).unwrap_or(fallback)
    }

    /// Sets one preference, keeping the others.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encode`] if `value` cannot be represented as
    /// JSON, or the store error.
    pub fn set<T: Serialize>(&self, name: &str, value: T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(|e| StorageError::encode(keys::USER_PREFERENCES, e))?;
        self.value.update(|prefs| {
            let mut prefs = prefs.clone();
            prefs.insert(name.to_owned(), value);
            prefs
        })
    }

    /// Restores the defaults.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn reset(&self) -> Result<(), StorageError> {
        self.value.set(self.value.default_value().clone())
    }

    /// Removes the preferences key entirely.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn remove(&self) -> Result<(), StorageError> {
        self.value.remove()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn store() -> Arc<Store> {
        Arc::new(Store::in_memory())
    }

    #[test]
    fn test_list_operations() {
        let list = StoredList::new(store(), "tags");
        for tag in ["a", "b", "c"] {
            list.push(tag.to_owned()).unwrap();
        }
        list.remove_at(1).unwrap();
        assert_eq!(list.items(), vec!["a", "c"]);

        list.update_at(0, "z".to_owned()).unwrap();
        list.update_at(9, "ignored".to_owned()).unwrap();
        assert_eq!(list.items(), vec!["z", "c"]);
        assert!(list.contains(&"c".to_owned()));
        assert_eq!(list.len(), 2);

        list.clear().unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_recent_items_dedupe_and_cap() {
        let recent = RecentItems::new(store(), "recent_searches", 3);
        for term in ["стол", "стул", "шкаф", "стол", "лампа"] {
            recent.add(term.to_owned()).unwrap();
        }
        assert_eq!(recent.items(), vec!["лампа", "стол", "шкаф"]);

        recent.remove(&"стол".to_owned()).unwrap();
        assert_eq!(recent.items(), vec!["лампа", "шкаф"]);
        recent.clear().unwrap();
        assert!(recent.items().is_empty());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Viewed {
        id: i64,
        name: String,
    }

    #[test]
    fn test_recent_items_by_identity() {
        let recent = RecentItems::with_identity(store(), "recent_assets", DEFAULT_RECENT_ITEMS, |a: &Viewed, b| {
            a.id == b.id
        });
        recent.add(Viewed { id: 1, name: "old".into() }).unwrap();
        recent.add(Viewed { id: 2, name: "other".into() }).unwrap();
        recent.add(Viewed { id: 1, name: "renamed".into() }).unwrap();

        let items = recent.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "renamed");
    }

    #[test]
    fn test_preferences() {
        let store = store();
        let defaults = BTreeMap::from([("page_size".to_owned(), serde_json::json!(10))]);
        let prefs = Preferences::new(Arc::clone(&store), defaults);
        assert_eq!(prefs.get::<u32>("page_size"), Some(10));

        prefs.set("page_size", 50).unwrap();
        prefs.set("compact", true).unwrap();
        assert_eq!(prefs.get::<u32>("page_size"), Some(50));
        assert!(prefs.get_or("compact", false));
        assert_eq!(prefs.get::<String>("page_size"), None);
        assert!(store.contains(keys::USER_PREFERENCES));

        prefs.reset().unwrap();
        assert_eq!(prefs.all().len(), 1);
        prefs.remove().unwrap();
        assert!(!store.contains(keys::USER_PREFERENCES));
    }
}
