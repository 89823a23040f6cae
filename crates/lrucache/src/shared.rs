//! Thread-shareable handle around a single [`LruCache`]
//!
//! Every `get` relinks the recency list, so reads mutate too. The whole
//! cache sits behind one mutex and each call holds it for one operation.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Capacity;
use crate::error::Result;
use crate::lru::LruCache;
use crate::stats::StatsSnapshot;

/// Cloneable, lock-protected LRU cache handle
pub struct SharedLruCache<K, V> {
    inner: Arc<Mutex<LruCache<K, V>>>,
}

impl<K, V> Clone for SharedLruCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> SharedLruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new shared cache with the given capacity
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` if `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self::from_cache(LruCache::new(capacity)?))
    }

    /// Create a new shared cache from an already validated capacity
    pub fn with_capacity(capacity: Capacity) -> Self {
        Self::from_cache(LruCache::with_capacity(capacity))
    }

    /// Share an existing cache
    pub fn from_cache(cache: LruCache<K, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Get a copy of a value and mark it most recently used
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or overwrite a key-value pair
    pub fn put(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    /// Insert or overwrite a key-value pair, returning the evicted entry
    pub fn push(&self, key: K, value: V) -> Option<(K, V)> {
        self.inner.lock().push(key, value)
    }

    /// Remove a key from the cache
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().remove(key)
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Get the maximum number of entries
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Copy the cache statistics
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.inner.lock().stats().snapshot()
    }

    /// Run several operations under one lock acquisition
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut LruCache<K, V>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_shared_basic() {
        let cache = SharedLruCache::new(2).unwrap();

        cache.put(1, "a".to_string());
        cache.put(2, "b".to_string());
        assert_eq!(cache.get(&1), Some("a".to_string()));

        // 2 is least recent after the get above
        assert_eq!(cache.push(3, "c".to_string()), Some((2, "b".to_string())));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.capacity(), 2);
    }

    #[test]
    fn test_shared_rejects_zero() {
        assert!(SharedLruCache::<u8, u8>::new(0).is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let cache = SharedLruCache::new(4).unwrap();
        let other = cache.clone();

        other.put("k", 7);
        assert_eq!(cache.get(&"k"), Some(7));
        assert_eq!(cache.remove(&"k"), Some(7));
        assert!(other.is_empty());
    }

    #[test]
    fn test_string_keys_borrowed_lookup() {
        let cache: SharedLruCache<String, u32> = SharedLruCache::new(2).unwrap();
        cache.put("alpha".to_string(), 1);

        assert_eq!(cache.get("alpha"), Some(1));
        assert_eq!(cache.remove("alpha"), Some(1));
        assert_eq!(cache.get("alpha"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_with_lock_compound() {
        let cache = SharedLruCache::new(3).unwrap();
        cache.put(1, 1);

        let bumped = cache.with_lock(|inner| {
            let next = inner.peek(&1).copied().unwrap_or(0) + 1;
            inner.put(1, next);
            next
        });

        assert_eq!(bumped, 2);
        assert_eq!(cache.get(&1), Some(2));
    }

    #[test]
    fn test_concurrent_puts_respect_capacity() {
        let cache = SharedLruCache::new(16).unwrap();

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..500u64 {
                        cache.put(t * 1000 + i, i);
                        cache.get(&(t * 1000 + i / 2));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 16);
        let stats = cache.stats_snapshot();
        assert_eq!(stats.inserts, 2000);
        assert_eq!(stats.evictions, 2000 - 16);
        assert_eq!(stats.hits + stats.misses, 2000);
    }

    #[test]
    fn test_shared_clear() {
        let cache = SharedLruCache::with_capacity(Capacity::new(2).unwrap());
        cache.put(1, 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats_snapshot().inserts, 1);
    }
}
