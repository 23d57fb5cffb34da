//! TTL cache shared by every network adapter.
//!
//! Keys are `(operation, args)` strings like `"search:laptop:en:5"`. Stale
//! entries are dropped when touched, and the whole map is swept once it
//! grows past a soft cap, so a long-running process cannot accumulate dead
//! entries without bound.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use fxhash::FxHashMap;

/// Sweep threshold. Adapters cache small JSON-derived values, so this is
/// generous without being a memory hazard.
const SWEEP_AT: usize = 4096;

pub struct TtlCache<T> {
    ttl: Duration,
    inner: Mutex<FxHashMap<String, (Instant, T)>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            inner: Mutex::new(FxHashMap::default()),
        }
    }

    /// Default adapter TTL: one hour.
    pub fn hourly() -> Self {
        Self::new(Duration::from_secs(3600))
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let mut map = self.inner.lock().expect("ttl cache poisoned");
        match map.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: impl Into<String>, value: T) {
        let mut map = self.inner.lock().expect("ttl cache poisoned");
        if map.len() >= SWEEP_AT {
            let ttl = self.ttl;
            map.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        }
        map.insert(key.into(), (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("ttl cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        cache.put("k", 7);
        assert_eq!(cache.get("k"), Some(7));
    }

    #[test]
    fn stale_entries_are_evicted_on_get() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_millis(0));
        cache.put("k", 7);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn overwrite_refreshes_value() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        cache.put("k", 1);
        cache.put("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
