use super::classifier::ClassificationResult;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

struct Inner {
    entries: FxHashMap<String, ClassificationResult>,
    // Insertion order, oldest first. Holds exactly the keys of `entries`.
    order: VecDeque<String>,
}

/// Bounded address -> result cache with insertion-order eviction.
///
/// Keys come from `NormalizedAddress::cache_key`: a bare domain, or a domain
/// followed by `/` or `?` and the rest of the address.
///
/// When an insert would exceed capacity, the oldest quarter of the entries
/// is dropped in one pass. Reads do not refresh an entry's position.
pub struct ResultCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: FxHashMap::default(),
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-written,
        // so keep serving from it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<ClassificationResult> {
        self.lock().entries.get(key).cloned()
    }

    pub fn insert(&self, key: &str, result: ClassificationResult) {
        let mut inner = self.lock();

        if let Some(existing) = inner.entries.get_mut(key) {
            *existing = result;
            return;
        }

        if inner.entries.len() >= self.capacity {
            let evict = (self.capacity / 4).max(1);
            for _ in 0..evict {
                match inner.order.pop_front() {
                    Some(key) => {
                        inner.entries.remove(&key);
                    }
                    None => break,
                }
            }
            debug!(
                "Result cache full ({}), evicted {} oldest entries",
                self.capacity, evict
            );
        }

        inner.order.push_back(key.to_string());
        inner.entries.insert(key.to_string(), result);
    }

    /// Drops every entry for `domain`, whatever its path. Returns the number
    /// of entries removed.
    pub fn invalidate(&self, domain: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key_has_domain(key, domain));
        let removed = before - inner.entries.len();
        if removed > 0 {
            inner.order.retain(|key| !key_has_domain(key, domain));
        }
        removed
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn key_has_domain(key: &str, domain: &str) -> bool {
    match key.strip_prefix(domain) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?']),
        None => false,
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> ClassificationResult {
        ClassificationResult::allowed("no match")
    }

    #[test]
    fn test_eviction_drops_oldest_quarter() {
        let cache = ResultCache::new(8);
        for i in 0..8 {
            cache.insert(&format!("site{}.com", i), allowed());
        }
        assert_eq!(cache.len(), 8);

        cache.insert("late.com", allowed());
        assert_eq!(cache.len(), 7);
        assert!(cache.get("site0.com").is_none());
        assert!(cache.get("site1.com").is_none());
        assert!(cache.get("site2.com").is_some());
        assert!(cache.get("late.com").is_some());
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let cache = ResultCache::new(100);
        for i in 0..1000 {
            cache.insert(&format!("d{}.example", i), allowed());
            assert!(cache.len() <= cache.capacity());
        }
        assert!(cache.get("d999.example").is_some());
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let cache = ResultCache::new(4);
        cache.insert("a.com", allowed());
        cache.insert("b.com", allowed());
        cache.insert("a.com", allowed());
        assert_eq!(cache.len(), 2);

        cache.insert("c.com", allowed());
        cache.insert("d.com", allowed());
        cache.insert("e.com", allowed());
        // a.com was inserted first, so it is evicted first.
        assert!(cache.get("a.com").is_none());
        assert!(cache.get("b.com").is_some());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = ResultCache::new(4);
        cache.insert("a.com", allowed());
        cache.insert("b.com", allowed());

        assert_eq!(cache.invalidate("a.com"), 1);
        assert_eq!(cache.invalidate("a.com"), 0);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_covers_every_path_of_domain() {
        let cache = ResultCache::new(8);
        cache.insert("a.com", allowed());
        cache.insert("a.com/x/1", allowed());
        cache.insert("a.com/?q=1", allowed());
        cache.insert("a.com.evil.net/x", allowed());
        cache.insert("ba.com", allowed());

        assert_eq!(cache.invalidate("a.com"), 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a.com.evil.net/x").is_some());
        assert!(cache.get("ba.com").is_some());

        // Order bookkeeping stays in sync with the map
        for i in 0..8 {
            cache.insert(&format!("n{}.com", i), allowed());
        }
        assert!(cache.len() <= cache.capacity());
    }
}
