//! Generation-stamped cache of leaderboard snapshots.
//!
//! Every structural mutation bumps the leaderboard's version. A cached
//! snapshot is served only while its stamp equals the current version, so
//! repeated identical queries between mutations hand back the very same
//! `Arc`, and callers can detect "nothing changed" with `Arc::ptr_eq`.
//!
//! Storage is a bounded `moka::sync::Cache`; least recently used time
//! points fall out once the capacity is reached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;

use crate::snapshot::{LeaderboardSnapshot, SnapshotRequest};
use crate::time::TimePoint;

/// Default number of cached snapshots per leaderboard.
pub const DEFAULT_SNAPSHOT_CACHE_CAPACITY: u64 = 10;

/// Cache key: the query time point and request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub at: TimePoint,
    pub request: SnapshotRequest,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because the leaderboard changed.
    pub invalidations: u64,
    pub entries: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct SnapshotCache {
    cache: Cache<SnapshotKey, (u64, Arc<LeaderboardSnapshot>)>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl SnapshotCache {
    /// Create a cache holding at most `capacity` snapshots.
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Look up a snapshot computed at `version`.
    ///
    /// Entries stamped with another version count as misses.
    pub fn get(&self, key: &SnapshotKey, version: u64) -> Option<Arc<LeaderboardSnapshot>> {
        match self.cache.get(key) {
            Some((stamp, snapshot)) if stamp == version => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(at = %key.at, version, "snapshot cache hit");
                Some(snapshot)
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(at = %key.at, version, "snapshot cache miss");
                None
            }
        }
    }

    pub fn insert(&self, key: SnapshotKey, version: u64, snapshot: Arc<LeaderboardSnapshot>) {
        self.cache.insert(key, (version, snapshot));
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Arc<LeaderboardSnapshot> {
        Arc::new(LeaderboardSnapshot::empty("Test", TimePoint::from_millis(0), 0))
    }

    fn key(millis: i64) -> SnapshotKey {
        SnapshotKey {
            at: TimePoint::from_millis(millis),
            request: SnapshotRequest::all(),
        }
    }

    #[test]
    fn test_hit_returns_same_arc() {
        let cache = SnapshotCache::default();
        let stored = snapshot();
        cache.insert(key(1), 7, Arc::clone(&stored));

        let found = cache.get(&key(1), 7).unwrap();
        assert!(Arc::ptr_eq(&found, &stored));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_stale_version_is_a_miss() {
        let cache = SnapshotCache::default();
        cache.insert(key(1), 7, snapshot());

        assert!(cache.get(&key(1), 8).is_none());
        assert!(cache.get(&key(2), 7).is_none());
        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_invalidate_all_clears_entries() {
        let cache = SnapshotCache::default();
        cache.insert(key(1), 1, snapshot());
        cache.invalidate_all();

        assert!(cache.get(&key(1), 1).is_none());
        assert_eq!(cache.stats().invalidations, 1);
    }
}
