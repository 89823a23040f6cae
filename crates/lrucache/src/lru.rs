//! LRU (Least Recently Used) cache implementation
//!
//! Nodes live in an arena (`Vec`) and link to each other by index. Slots 0
//! and 1 are permanent head/tail sentinels, so linking and unlinking never
//! special-case an empty list or a list edge:
//!
//! ```text
//! [HEAD] <-> MRU <-> ... <-> LRU <-> [TAIL]
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use ahash::RandomState;
use tracing::{debug, trace};

use crate::config::{CacheConfig, Capacity};
use crate::error::Result;
use crate::stats::CacheStats;

/// Arena slot of the head sentinel (most recently used side)
const HEAD: usize = 0;

/// Arena slot of the tail sentinel (least recently used side)
const TAIL: usize = 1;

/// Node in the LRU doubly-linked list
///
/// `entry` is `None` for the sentinels and for slots on the free list.
struct Node<K, V> {
    entry: Option<(K, V)>,
    prev: usize,
    next: usize,
}

impl<K, V> Node<K, V> {
    fn sentinel() -> Self {
        Self {
            entry: None,
            prev: HEAD,
            next: TAIL,
        }
    }
}

/// LRU cache with fixed capacity
///
/// Every `get` hit and every `put` makes the touched entry the most recently
/// used. When a `put` of a new key takes the cache past its capacity, the
/// least recently used entry is evicted.
///
/// ```
/// use lrucache::LruCache;
///
/// let mut cache = LruCache::new(2)?;
/// cache.put(1, "one");
/// cache.put(2, "two");
/// assert_eq!(cache.get(&1), Some(&"one"));
///
/// cache.put(3, "three"); // evicts 2
/// assert_eq!(cache.get(&2), None);
/// # Ok::<(), lrucache::Error>(())
/// ```
pub struct LruCache<K, V, S = RandomState> {
    map: HashMap<K, usize, S>,
    nodes: Vec<Node<K, V>>,
    free_list: Vec<usize>,
    capacity: Capacity,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU cache with the given capacity
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` if `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self::with_capacity(Capacity::new(capacity)?))
    }

    /// Create a new LRU cache from an already validated capacity
    pub fn with_capacity(capacity: Capacity) -> Self {
        Self::with_hasher(capacity, RandomState::new())
    }

    /// Create a new LRU cache from a config
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_capacity(config.capacity)
    }
}

impl<K, V, S> LruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Create a new LRU cache using `hasher` for the key index
    pub fn with_hasher(capacity: Capacity, hasher: S) -> Self {
        let slots = capacity.get().saturating_add(3);
        let mut nodes = Vec::with_capacity(slots.min(4096));
        nodes.push(Node::sentinel());
        nodes.push(Node::sentinel());

        debug!(capacity = capacity.get(), "created LRU cache");

        Self {
            map: HashMap::with_capacity_and_hasher(capacity.get().min(4096), hasher),
            nodes,
            free_list: Vec::new(),
            capacity,
            stats: CacheStats::new(),
        }
    }

    /// Get a value and mark it most recently used
    ///
    /// A miss returns `None` and leaves the cache untouched.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.lookup(key)?;
        self.move_to_front(idx);
        self.nodes[idx].entry.as_ref().map(|(_, value)| value)
    }

    /// Get a mutable reference to a value and mark it most recently used
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.lookup(key)?;
        self.move_to_front(idx);
        self.nodes[idx].entry.as_mut().map(|(_, value)| value)
    }

    /// Get a value without changing its recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let &idx = self.map.get(key)?;
        self.nodes[idx].entry.as_ref().map(|(_, value)| value)
    }

    /// Check whether a key is cached, without changing its recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Insert or overwrite a key-value pair
    ///
    /// An existing key is updated in place and does not count towards the
    /// capacity a second time.
    pub fn put(&mut self, key: K, value: V) {
        self.push(key, value);
    }

    /// Insert or overwrite a key-value pair, returning the evicted entry
    ///
    /// Returns `Some((key, value))` when inserting a new key pushed the least
    /// recently used entry out, `None` otherwise.
    pub fn push(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            if let Some((_, slot)) = self.nodes[idx].entry.as_mut() {
                *slot = value;
            }
            self.move_to_front(idx);
            self.stats.record_update();
            return None;
        }

        let idx = self.alloc_node(key.clone(), value);
        self.attach_front(idx);
        self.map.insert(key, idx);
        self.stats.record_insert();

        if self.map.len() <= self.capacity.get() {
            return None;
        }

        let evicted = self.detach_lru();
        if evicted.is_some() {
            self.stats.record_eviction();
            trace!(len = self.map.len(), "evicted least recently used entry");
        }
        evicted
    }

    /// Remove a key from the cache
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.detach(idx);
        self.free_list.push(idx);
        let (_, value) = self.nodes[idx].entry.take()?;
        self.stats.record_removal();
        Some(value)
    }

    /// Peek at the entry that would be evicted next
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let idx = self.nodes[TAIL].prev;
        if idx == HEAD {
            return None;
        }
        self.nodes[idx].entry.as_ref().map(|(key, value)| (key, value))
    }

    /// Remove and return the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let popped = self.detach_lru();
        if popped.is_some() {
            self.stats.record_removal();
        }
        popped
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Drop every entry (statistics are kept)
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.truncate(2);
        self.nodes[HEAD] = Node::sentinel();
        self.nodes[TAIL] = Node::sentinel();
        self.free_list.clear();
    }

    /// Iterate entries from most to least recently used
    ///
    /// Iterating does not change recency.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            cursor: self.nodes[HEAD].next,
            remaining: self.map.len(),
        }
    }

    /// Iterate keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    fn lookup<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.map.get(key) {
            Some(&idx) => {
                self.stats.record_hit();
                Some(idx)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.nodes[HEAD].next == idx {
            return; // Already at front
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    /// Link `idx` right after the head sentinel
    fn attach_front(&mut self, idx: usize) {
        let first = self.nodes[HEAD].next;
        self.nodes[idx].prev = HEAD;
        self.nodes[idx].next = first;
        self.nodes[first].prev = idx;
        self.nodes[HEAD].next = idx;
    }

    /// Unlink `idx` from its neighbours; its own links are left stale
    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    fn detach_lru(&mut self) -> Option<(K, V)> {
        let idx = self.nodes[TAIL].prev;
        if idx == HEAD {
            return None;
        }
        self.detach(idx);
        self.free_list.push(idx);
        let (key, value) = self.nodes[idx].entry.take()?;
        self.map.remove(&key);
        Some((key, value))
    }

    fn alloc_node(&mut self, key: K, value: V) -> usize {
        let node = Node {
            entry: Some((key, value)),
            prev: HEAD,
            next: TAIL,
        };
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = node;
            idx
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }
}

impl<K, V, S> fmt::Debug for LruCache<K, V, S>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("entries", &DebugEntries(self))
            .finish()
    }
}

struct DebugEntries<'a, K, V, S>(&'a LruCache<K, V, S>);

impl<K, V, S> fmt::Debug for DebugEntries<'_, K, V, S>
where
    K: Hash + Eq + Clone + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Iterator over cache entries, most recently used first
pub struct Iter<'a, K, V> {
    nodes: &'a [Node<K, V>],
    cursor: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == TAIL || self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.cursor];
        self.cursor = node.next;
        self.remaining -= 1;
        node.entry.as_ref().map(|(key, value)| (key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a LruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
impl<K, V, S> LruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Walk the list both ways and cross-check it against the index
    fn assert_invariants(&self) {
        let mut count = 0;
        let mut prev = HEAD;
        let mut idx = self.nodes[HEAD].next;
        while idx != TAIL {
            let node = &self.nodes[idx];
            assert_eq!(node.prev, prev, "broken back link at slot {idx}");
            let (key, _) = node.entry.as_ref().expect("linked slot without entry");
            assert_eq!(self.map.get(key), Some(&idx), "index disagrees at slot {idx}");
            count += 1;
            assert!(count <= self.map.len(), "list longer than index");
            prev = idx;
            idx = node.next;
        }
        assert_eq!(self.nodes[TAIL].prev, prev, "tail sentinel out of sync");
        assert_eq!(count, self.map.len(), "orphaned index entries");
        assert!(count <= self.capacity(), "capacity exceeded");
        assert!(self.nodes[HEAD].entry.is_none() && self.nodes[TAIL].entry.is_none());
        for &free in &self.free_list {
            assert!(free > TAIL && self.nodes[free].entry.is_none());
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Put(u8, u16),
        Get(u8),
        Peek(u8),
        Remove(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0..12u8, any::<u16>()).prop_map(|(k, v)| Op::Put(k, v)),
            3 => (0..12u8).prop_map(Op::Get),
            1 => (0..12u8).prop_map(Op::Peek),
            1 => (0..12u8).prop_map(Op::Remove),
        ]
    }

    /// Reference model: entries ordered most recently used first
    struct Model {
        capacity: usize,
        entries: Vec<(u8, u16)>,
    }

    impl Model {
        fn position(&self, key: u8) -> Option<usize> {
            self.entries.iter().position(|(k, _)| *k == key)
        }

        fn get(&mut self, key: u8) -> Option<u16> {
            let pos = self.position(key)?;
            let entry = self.entries.remove(pos);
            self.entries.insert(0, entry);
            Some(entry.1)
        }

        fn push(&mut self, key: u8, value: u16) -> Option<(u8, u16)> {
            if let Some(pos) = self.position(key) {
                self.entries.remove(pos);
                self.entries.insert(0, (key, value));
                return None;
            }
            self.entries.insert(0, (key, value));
            if self.entries.len() > self.capacity {
                self.entries.pop()
            } else {
                None
            }
        }

        fn remove(&mut self, key: u8) -> Option<u16> {
            let pos = self.position(key)?;
            Some(self.entries.remove(pos).1)
        }
    }

    proptest! {
        #[test]
        fn prop_matches_reference_model(
            capacity in 1..6usize,
            ops in proptest::collection::vec(op_strategy(), 0..200),
        ) {
            let mut cache = LruCache::new(capacity).unwrap();
            let mut model = Model { capacity, entries: Vec::new() };

            for op in ops {
                match op {
                    Op::Put(k, v) => prop_assert_eq!(cache.push(k, v), model.push(k, v)),
                    Op::Get(k) => prop_assert_eq!(cache.get(&k).copied(), model.get(k)),
                    Op::Peek(k) => {
                        let expected = model.position(k).map(|pos| model.entries[pos].1);
                        prop_assert_eq!(cache.peek(&k).copied(), expected);
                    }
                    Op::Remove(k) => prop_assert_eq!(cache.remove(&k), model.remove(k)),
                }
                cache.assert_invariants();
                prop_assert!(cache.len() <= capacity);
                let actual: Vec<(u8, u16)> = cache.iter().map(|(k, v)| (*k, *v)).collect();
                prop_assert_eq!(actual, model.entries.clone());
            }
        }

        #[test]
        fn prop_miss_does_not_reorder(
            keys in proptest::collection::vec(0..8u8, 1..30),
            probe in 8..16u8,
        ) {
            let mut cache = LruCache::new(4).unwrap();
            for k in keys {
                cache.put(k, k);
            }
            let before: Vec<u8> = cache.keys().copied().collect();
            prop_assert_eq!(cache.get(&probe), None);
            let after: Vec<u8> = cache.keys().copied().collect();
            prop_assert_eq!(before, after);
        }
    }
}
