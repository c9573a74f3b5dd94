//! Time-bounded response cache.
//!
//! Entries are stamped with [`tokio::time::Instant`], so tests running on a
//! paused clock can advance past the TTL without sleeping.

use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// A keyed cache whose entries go stale after a fixed TTL.
///
/// Stale entries are kept until overwritten or cleared so callers can fall
/// back to them when a refresh fails.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<FxHashMap<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { entries: RwLock::new(FxHashMap::default()), ttl }
    }

    /// Returns the TTL.
    #[inline]
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the value if it is younger than the TTL.
    #[must_use]
    pub fn get_fresh(&self, key: &str) -> Option<V> {
        self.get_within(key, self.ttl)
    }

    /// Returns the value if it is younger than `ttl`.
    #[must_use]
    pub fn get_within(&self, key: &str, ttl: Duration) -> Option<V> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        (entry.stored_at.elapsed() < ttl).then(|| entry.value.clone())
    }

    /// Returns the value regardless of age.
    #[must_use]
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.entries.read().get(key).map(|entry| entry.value.clone())
    }

    /// Stores a value, stamping it with the current time.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries
            .write()
            .insert(key.into(), Entry { value, stored_at: Instant::now() });
    }

    /// Removes one entry.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.write().remove(key).map(|entry| entry.value)
    }

    /// Removes entries whose key contains `pattern`, or all entries.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        match pattern {
            Some(pattern) => entries.retain(|key, _| !key.contains(pattern)),
            None => entries.clear(),
        }
        before - entries.len()
    }

    /// Returns the number of entries, fresh or stale.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_goes_stale_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("/assets?page=1", 1);
        assert_eq!(cache.get_fresh("/assets?page=1"), Some(1));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get_fresh("/assets?page=1"), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get_fresh("/assets?page=1"), None);
        assert_eq!(cache.get_stale("/assets?page=1"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_refreshes_timestamp() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("k", "old");
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.insert("k", "new");
        assert_eq!(cache.get_fresh("k"), Some("new"));
    }

    #[test]
    fn test_clear_by_pattern() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("/assets?page=1", 1);
        cache.insert("/assets?page=2", 2);
        cache.insert("/warehouses", 3);

        assert_eq!(cache.clear(Some("/assets")), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_stale("/warehouses"), Some(3));

        assert_eq!(cache.clear(None), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("k", 5);
        assert_eq!(cache.remove("k"), Some(5));
        assert_eq!(cache.remove("k"), None);
    }
}
