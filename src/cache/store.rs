//! Bounded memo store shared by the document and highlight layers.

use std::{hash::Hash, num::NonZeroUsize, sync::Arc, sync::RwLock};

use lru::LruCache;
use metrics::counter;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT: &str = "markpane_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "markpane_cache_miss_total";
pub const METRIC_CACHE_EVICT: &str = "markpane_cache_evict_total";

/// Which memo store a metric or log line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLayer {
    Document,
    Highlight,
}

impl CacheLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheLayer::Document => "document",
            CacheLayer::Highlight => "highlight",
        }
    }
}

/// LRU store handing out shared values.
///
/// Values are computed outside the lock: two threads racing on the same key
/// may both compute, and the last insert wins.
pub struct MemoStore<K: Hash + Eq, V> {
    layer: CacheLayer,
    enabled: bool,
    entries: RwLock<LruCache<K, Arc<V>>>,
}

impl<K: Hash + Eq, V> MemoStore<K, V> {
    pub fn new(layer: CacheLayer, capacity: NonZeroUsize, enabled: bool) -> Self {
        Self {
            layer,
            enabled,
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Look up `key`, treating entries rejected by `is_valid` as misses.
    pub fn get(&self, key: &K, is_valid: impl Fn(&V) -> bool) -> Option<Arc<V>> {
        if !self.enabled {
            return None;
        }

        let found = rw_write(&self.entries, SOURCE, "get")
            .get(key)
            .filter(|value| is_valid(value))
            .cloned();

        let metric = if found.is_some() {
            METRIC_CACHE_HIT
        } else {
            METRIC_CACHE_MISS
        };
        counter!(metric, "layer" => self.layer.as_str()).increment(1);

        found
    }

    pub fn insert(&self, key: K, value: Arc<V>) {
        if !self.enabled {
            return;
        }

        let mut entries = rw_write(&self.entries, SOURCE, "insert");
        let replacing = entries.contains(&key);
        let evicted = entries.push(key, value);
        if evicted.is_some() && !replacing {
            counter!(METRIC_CACHE_EVICT, "layer" => self.layer.as_str()).increment(1);
        }
    }

    /// Return the cached value for `key` or compute, store and return it.
    pub fn get_or_insert_with(
        &self,
        key: K,
        is_valid: impl Fn(&V) -> bool,
        compute: impl FnOnce() -> V,
    ) -> Arc<V> {
        if let Some(hit) = self.get(&key, is_valid) {
            return hit;
        }

        let value = Arc::new(compute());
        self.insert(key, Arc::clone(&value));
        value
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn store(capacity: usize) -> MemoStore<&'static str, String> {
        MemoStore::new(
            CacheLayer::Document,
            NonZeroUsize::new(capacity).expect("non-zero"),
            true,
        )
    }

    #[test]
    fn hit_returns_same_arc() {
        let store = store(4);
        let first = store.get_or_insert_with("a", |_| true, || "one".to_string());
        let second = store.get_or_insert_with("a", |_| true, || "two".to_string());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, "one");
    }

    #[test]
    fn invalid_entries_are_recomputed() {
        let store = store(4);
        store.get_or_insert_with("a", |_| true, || "stale".to_string());
        let fresh = store.get_or_insert_with("a", |v| v != "stale", || "fresh".to_string());
        assert_eq!(*fresh, "fresh");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn capacity_evicts_least_recent() {
        let store = store(1);
        store.get_or_insert_with("a", |_| true, || "a".to_string());
        store.get_or_insert_with("b", |_| true, || "b".to_string());
        assert_eq!(store.len(), 1);
        assert!(store.get(&"a", |_| true).is_none());
        assert!(store.get(&"b", |_| true).is_some());
    }

    #[test]
    fn disabled_store_always_computes() {
        let store: MemoStore<&'static str, String> =
            MemoStore::new(CacheLayer::Highlight, NonZeroUsize::MIN, false);
        let calls = Cell::new(0);
        for _ in 0..3 {
            store.get_or_insert_with(
                "a",
                |_| true,
                || {
                    calls.set(calls.get() + 1);
                    "a".to_string()
                },
            );
        }
        assert_eq!(calls.get(), 3);
        assert!(store.is_empty());
    }
}
