//! Result caches for external lookups.
//!
//! Entries are written once and never mutated. Absence means "never
//! attempted"; callers store empty collections for "attempted, found
//! nothing" and store nothing at all when an attempt failed.

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use lru::LruCache;

/// Key/value memo shared by the resolvers. Each call takes the lock once,
/// so an insert is atomic per key.
pub trait ResultCache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn insert(&self, key: K, value: V);
    fn contains(&self, key: &K) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded cache living as long as the engine.
pub struct MemoryCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> MemoryCache<K, V> {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

impl<K, V> Default for MemoryCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ResultCache<K, V> for MemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn insert(&self, key: K, value: V) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key, value);
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Size-bounded cache; least recently read entries are evicted first.
pub struct LruResultCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V> LruResultCache<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }
}

impl<K, V> ResultCache<K, V> for LruResultCache<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn insert(&self, key: K, value: V) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).put(key, value);
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).contains(key)
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// `None` or `Some(0)` builds an unbounded cache.
pub fn build_cache<K, V>(capacity: Option<usize>) -> Arc<dyn ResultCache<K, V>>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    match capacity.and_then(NonZeroUsize::new) {
        Some(cap) => Arc::new(LruResultCache::new(cap)),
        None => Arc::new(MemoryCache::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_distinguishes_empty_from_absent() {
        let cache: MemoryCache<String, Vec<u32>> = MemoryCache::new();
        assert!(!cache.contains(&"KIT".to_string()));
        cache.insert("KIT".to_string(), vec![]);
        assert!(cache.contains(&"KIT".to_string()));
        assert_eq!(cache.get(&"KIT".to_string()), Some(vec![]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let cache = LruResultCache::new(NonZeroUsize::new(2).unwrap());
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.insert("c", 3);

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_build_cache_zero_capacity_is_unbounded() {
        let cache = build_cache::<u32, u32>(Some(0));
        for i in 0..100 {
            cache.insert(i, i);
        }
        assert_eq!(cache.len(), 100);

        let bounded = build_cache::<u32, u32>(Some(10));
        for i in 0..100 {
            bounded.insert(i, i);
        }
        assert_eq!(bounded.len(), 10);
    }
}
