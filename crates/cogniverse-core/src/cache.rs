//! Bounded reply cache keyed by prompt text.

use std::collections::{HashMap, VecDeque};

/// Default number of cached replies.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Maps normalized prompts to previously returned replies.
///
/// Eviction is strictly FIFO: when full, the entry inserted earliest is
/// dropped, regardless of how recently it was read. Entries never expire and
/// are not persisted.
///
/// The key ignores conversation context, so the same prompt asked in a
/// different conversation gets the cached reply.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl ResponseCache {
    /// Creates a cache holding at most `capacity` replies (minimum one).
    ///
    /// Storage grows with use; nothing is reserved up front.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Cache key for a raw prompt: trimmed and lowercased, nothing else.
    pub fn key_for(prompt: &str) -> String {
        prompt.trim().to_lowercase()
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Stores a reply. Overwriting an existing key keeps its position in the
    /// eviction order; a new key evicts the oldest entry when full.
    pub fn store(&mut self, key: impl Into<String>, reply: impl Into<String>) {
        let key = key.into();
        let reply = reply.into();

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = reply;
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, reply);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_trims_and_lowercases_only() {
        assert_eq!(ResponseCache::key_for("  Hello There  "), "hello there");
        assert_eq!(ResponseCache::key_for("Hi,   you!"), "hi,   you!");
    }

    #[test]
    fn overflow_evicts_oldest_inserted() {
        let capacity = 5;
        let mut cache = ResponseCache::new(capacity);
        for i in 0..12 {
            cache.store(format!("k{i}"), format!("v{i}"));
        }

        assert_eq!(cache.len(), capacity);
        for i in 0..7 {
            assert!(cache.lookup(&format!("k{i}")).is_none(), "k{i} should be evicted");
        }
        for i in 7..12 {
            assert_eq!(cache.lookup(&format!("k{i}")), Some(format!("v{i}").as_str()));
        }
    }

    #[test]
    fn reads_do_not_refresh_position() {
        let mut cache = ResponseCache::new(2);
        cache.store("a", "1");
        cache.store("b", "2");
        assert_eq!(cache.lookup("a"), Some("1"));

        cache.store("c", "3");
        assert!(cache.lookup("a").is_none());
        assert_eq!(cache.lookup("b"), Some("2"));
        assert_eq!(cache.lookup("c"), Some("3"));
    }

    #[test]
    fn overwrite_keeps_size_and_position() {
        let mut cache = ResponseCache::new(2);
        cache.store("a", "1");
        cache.store("b", "2");
        cache.store("a", "updated");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("a"), Some("updated"));

        cache.store("c", "3");
        assert!(cache.lookup("a").is_none());
        assert_eq!(cache.lookup("b"), Some("2"));
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = ResponseCache::default();
        cache.store("a", "1");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn huge_capacity_reserves_nothing() {
        let mut cache = ResponseCache::new(usize::MAX);
        assert_eq!(cache.capacity(), usize::MAX);
        cache.store("a", "1");
        assert_eq!(cache.lookup("a"), Some("1"));
        assert_eq!(cache.len(), 1);
    }
}
