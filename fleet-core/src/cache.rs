//! Per-`(context, namespace, kind)` TTL+LRU cache of list snapshots.
//!
//! Holds one `CacheEntry` per `CacheKey`, evicting on either TTL
//! expiry (checked on read and by the cleanup routine) or LRU pressure
//! at capacity. Behind a single `parking_lot::Mutex` guarding the LRU
//! map and the running hit/miss/eviction counters together, matching
//! the one-mutex-per-component discipline the rest of this crate
//! follows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_model::{CacheEntry, CacheKey, CacheMetricsSnapshot, VersionToken};
use lru::LruCache;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A snapshot value the cache stores per key. Kept generic over `T` so
/// both the `ResourceCache<Row>`-shaped projection cache and a future
/// raw-object cache can share this implementation; the fleet client
/// instantiates it over `fleet_model::ResourceObject`.
pub struct ResourceCache<T> {
    inner: Mutex<Inner<T>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    ttl: Duration,
}

struct Inner<T> {
    entries: LruCache<CacheKey, CacheEntry<T>>,
}

impl<T: Clone> ResourceCache<T> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).expect("capacity >= 1");
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            ttl,
        }
    }

    /// Returns a hit only when the key is present and not TTL-expired.
    /// A hit refreshes the entry's LRU position; an expired entry is
    /// treated (and counted) as a miss but is left in place for
    /// `cleanup_expired` to reap, rather than removed inline, so a Get
    /// never takes the write path just to evict.
    pub fn get(&self, key: &CacheKey) -> Option<(Vec<T>, VersionToken)> {
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some((entry.snapshots.clone(), entry.version_token.clone()))
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts or replaces the entry for `key`, resetting its
    /// insertion timestamp. Evicts the least-recently-accessed entry
    /// when the map is at capacity and `key` is new.
    pub fn set(&self, key: CacheKey, snapshots: Vec<T>, version_token: impl Into<VersionToken>) {
        let entry = CacheEntry {
            snapshots,
            version_token: version_token.into(),
            inserted_at: Instant::now(),
        };
        let mut inner = self.inner.lock();
        let existed = inner.entries.contains(&key);
        // `push` returns the replaced entry's key-value pair both when
        // `key` already existed (an update, not an eviction) and when
        // capacity forced the LRU entry out for a brand new key; only
        // the latter counts as an eviction.
        if let Some((returned_key, _)) = inner.entries.push(key.clone(), entry) {
            if !existed && returned_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Removes the single entry for `key`, if present. Used by the
    /// Fleet Client for precise invalidation (a delete, or a watch
    /// event routed through the Event Processor) where
    /// `invalidate_namespace`'s prefix match would be too broad.
    pub fn remove(&self, key: &CacheKey) {
        self.inner.lock().entries.pop(key);
    }

    /// Removes every entry whose key's namespace starts with `prefix`.
    pub fn invalidate_namespace(&self, prefix: &str) {
        let mut inner = self.inner.lock();
        let stale: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(k, _)| k.namespace_has_prefix(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        let count = stale.len();
        for key in stale {
            inner.entries.pop(&key);
        }
        if count > 0 {
            debug!(prefix, count, "invalidated cache entries for namespace prefix");
        }
    }

    /// Scans all entries and removes the expired ones. Safe to run
    /// concurrently with `get`/`set`: both take the same single mutex.
    pub fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let ttl = self.ttl;
        let expired: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.entries.pop(key);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "cleaned up expired cache entries");
        }
        expired.len()
    }

    pub fn get_metrics(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawns a periodic `cleanup_expired` loop, stopping cooperatively
/// when `cancel` fires. Returns the task's `JoinHandle` so a caller
/// that wants to await its teardown can.
pub fn start_cleanup_routine<T>(
    cache: Arc<ResourceCache<T>>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(?interval, "resource cache cleanup routine started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("resource cache cleanup routine stopped");
                    break;
                }
                _ = ticker.tick() => {
                    cache.cleanup_expired();
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::ResourceKind;

    fn key(ns: &str) -> CacheKey {
        CacheKey {
            context: "ctx".into(),
            namespace: ns.into(),
            kind: ResourceKind::Pod,
        }
    }

    #[test]
    fn lru_eviction_at_capacity_two() {
        let cache: ResourceCache<i32> = ResourceCache::new(2, Duration::from_secs(60));
        cache.set(key("ns1"), vec![1], "v1");
        cache.set(key("ns2"), vec![2], "v2");
        cache.set(key("ns3"), vec![3], "v3");

        assert!(cache.get(&key("ns1")).is_none(), "ns1 should have been evicted");
        assert!(cache.get(&key("ns2")).is_some());
        assert!(cache.get(&key("ns3")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn ttl_expiry_then_cleanup_removes_entry() {
        let cache: ResourceCache<i32> = ResourceCache::new(10, Duration::from_millis(100));
        cache.set(key("default"), vec![1], "v1");
        assert!(cache.get(&key("default")).is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get(&key("default")).is_none());

        let removed = cache.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn invalidate_namespace_removes_matching_prefix_only() {
        let cache: ResourceCache<i32> = ResourceCache::new(10, Duration::from_secs(60));
        cache.set(
            CacheKey {
                context: "ctx".into(),
                namespace: "team-a".into(),
                kind: ResourceKind::Pod,
            },
            vec![1],
            "v1",
        );
        cache.set(
            CacheKey {
                context: "ctx".into(),
                namespace: "team-b".into(),
                kind: ResourceKind::Pod,
            },
            vec![2],
            "v2",
        );

        cache.invalidate_namespace("team-a");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn hit_ratio_reflects_counters() {
        let cache: ResourceCache<i32> = ResourceCache::new(10, Duration::from_secs(60));
        cache.set(key("default"), vec![1], "v1");
        cache.get(&key("default"));
        cache.get(&key("missing"));
        let metrics = cache.get_metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hit_ratio(), 0.5);
    }

    #[test]
    fn empty_cache_hit_ratio_is_zero() {
        let cache: ResourceCache<i32> = ResourceCache::new(10, Duration::from_secs(60));
        assert_eq!(cache.get_metrics().hit_ratio(), 0.0);
    }
}
