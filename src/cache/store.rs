//! Time-to-live cache for slow-changing reference data.
//!
//! Entries are replaced whole; an entry older than the configured ttl reads
//! as a miss and stays in place until the next `set` for its key.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";
const METRIC_CACHE_HIT: &str = "portal_cache_hit_total";
const METRIC_CACHE_MISS: &str = "portal_cache_miss_total";

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// In-memory cache keyed by logical resource name.
pub struct CacheStore<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value while it is younger than the ttl; `None` is a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let entries = rw_read(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => {
                counter!(METRIC_CACHE_HIT, "resource" => key.to_string()).increment(1);
                debug!(resource = %key, "cache hit");
                Some(entry.data.clone())
            }
            Some(_) => {
                counter!(METRIC_CACHE_MISS, "resource" => key.to_string()).increment(1);
                debug!(resource = %key, reason = "expired", "cache miss");
                None
            }
            None => {
                counter!(METRIC_CACHE_MISS, "resource" => key.to_string()).increment(1);
                debug!(resource = %key, reason = "absent", "cache miss");
                None
            }
        }
    }

    pub fn set(&self, key: K, value: V) {
        let entry = CacheEntry {
            data: value,
            fetched_at: Instant::now(),
        };
        rw_write(&self.entries, SOURCE, "set").insert(key, entry);
    }

    pub fn invalidate(&self, key: &K) {
        rw_write(&self.entries, SOURCE, "invalidate").remove(key);
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn entry_is_served_until_ttl_elapses() {
        let store: CacheStore<&'static str, u32> = CacheStore::new(TTL);
        assert!(store.get(&"users").is_none());

        store.set("users", 7);
        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert_eq!(store.get(&"users"), Some(7));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(store.get(&"users").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn set_replaces_expired_entry_and_restarts_ttl() {
        let store: CacheStore<&'static str, u32> = CacheStore::new(TTL);
        store.set("groups", 1);
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert!(store.get(&"groups").is_none());
        assert_eq!(store.len(), 1);

        store.set("groups", 2);
        assert_eq!(store.get(&"groups"), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_and_clear_drop_entries() {
        let store: CacheStore<&'static str, u32> = CacheStore::new(TTL);
        store.set("users", 1);
        store.set("positions", 2);

        store.invalidate(&"users");
        assert!(store.get(&"users").is_none());
        assert_eq!(store.get(&"positions"), Some(2));

        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn store_recovers_from_poisoned_lock() {
        let store: CacheStore<&'static str, u32> = CacheStore::new(TTL);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.set("users", 3);
        assert_eq!(store.get(&"users"), Some(3));
    }
}
