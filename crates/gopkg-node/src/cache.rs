//! Advertisement cache.
//!
//! Holds raw upstream advertisements keyed by repository root so repeated
//! requests for the same repository do not hit the upstream host. Misses are
//! not coalesced: concurrent requests for an uncached root all fetch.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Storage for upstream advertisements.
pub trait AdvertisementCache: Send + Sync {
    /// Returns a fresh advertisement for `repo_root`, if any.
    fn get(&self, repo_root: &str) -> Option<Bytes>;

    /// Stores an advertisement for `repo_root`.
    fn put(&self, repo_root: &str, data: Bytes);
}

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    stored_at: Instant,
}

/// In-memory cache whose entries expire after a fixed time to live.
#[derive(Debug)]
pub struct TtlCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, Entry>>,
}

impl TtlCache {
    /// Creates an empty cache.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn is_fresh(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    fn get_at(&self, repo_root: &str, now: Instant) -> Option<Bytes> {
        let entries = self.entries.read();
        entries
            .get(repo_root)
            .filter(|e| self.is_fresh(e, now))
            .map(|e| e.data.clone())
    }

    fn put_at(&self, repo_root: &str, data: Bytes, now: Instant) {
        let mut entries = self.entries.write();

        // Another writer may have stored a fresh copy while we were fetching.
        if entries
            .get(repo_root)
            .is_some_and(|e| self.is_fresh(e, now))
        {
            debug!(repo_root, "advertisement already cached");
            return;
        }

        if entries.len() >= self.max_entries && !entries.contains_key(repo_root) {
            entries.retain(|_, e| self.is_fresh(e, now));
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.stored_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            repo_root.to_string(),
            Entry {
                data,
                stored_at: now,
            },
        );
    }
}

impl AdvertisementCache for TtlCache {
    fn get(&self, repo_root: &str) -> Option<Bytes> {
        self.get_at(repo_root, Instant::now())
    }

    fn put(&self, repo_root: &str, data: Bytes) {
        self.put_at(repo_root, data, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_put_then_get() {
        let cache = TtlCache::new(TTL, 10);
        assert!(cache.get("github.com/go-yaml/yaml").is_none());

        cache.put("github.com/go-yaml/yaml", Bytes::from_static(b"refs"));
        assert_eq!(
            cache.get("github.com/go-yaml/yaml"),
            Some(Bytes::from_static(b"refs"))
        );
        assert!(cache.get("github.com/go-check/check").is_none());
    }

    #[test]
    fn test_entries_expire() {
        let cache = TtlCache::new(TTL, 10);
        let start = Instant::now();
        cache.put_at("root", Bytes::from_static(b"old"), start);

        assert!(cache.get_at("root", start + TTL / 2).is_some());
        assert!(cache.get_at("root", start + TTL).is_none());
    }

    #[test]
    fn test_fresh_entry_not_overwritten() {
        let cache = TtlCache::new(TTL, 10);
        let start = Instant::now();
        cache.put_at("root", Bytes::from_static(b"first"), start);
        cache.put_at("root", Bytes::from_static(b"second"), start + TTL / 2);

        assert_eq!(
            cache.get_at("root", start + TTL / 2),
            Some(Bytes::from_static(b"first"))
        );
    }

    #[test]
    fn test_stale_entry_replaced() {
        let cache = TtlCache::new(TTL, 10);
        let start = Instant::now();
        cache.put_at("root", Bytes::from_static(b"first"), start);
        cache.put_at("root", Bytes::from_static(b"second"), start + TTL * 2);

        assert_eq!(
            cache.get_at("root", start + TTL * 2),
            Some(Bytes::from_static(b"second"))
        );
    }

    #[test]
    fn test_stale_entries_swept_when_full() {
        let cache = TtlCache::new(TTL, 2);
        let start = Instant::now();
        cache.put_at("a", Bytes::from_static(b"a"), start);
        cache.put_at("b", Bytes::from_static(b"b"), start + TTL / 2);

        let later = start + TTL + Duration::from_secs(1);
        cache.put_at("c", Bytes::from_static(b"c"), later);

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("a", later).is_none());
        assert!(cache.get_at("b", later).is_some());
        assert!(cache.get_at("c", later).is_some());
    }

    #[test]
    fn test_oldest_evicted_when_all_fresh() {
        let cache = TtlCache::new(TTL, 2);
        let start = Instant::now();
        cache.put_at("a", Bytes::from_static(b"a"), start);
        cache.put_at("b", Bytes::from_static(b"b"), start + Duration::from_secs(1));
        cache.put_at("c", Bytes::from_static(b"c"), start + Duration::from_secs(2));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("a", start + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(TtlCache::new(TTL, 1000));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("root-{}", j % 10);
                        cache.put(&key, Bytes::from(format!("{i}-{j}")));
                        assert!(cache.get(&key).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 10);
    }
}
