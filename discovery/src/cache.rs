//! Time-bounded memoization with lazy eviction.
//!
//! Entries expire after a per-entry duration clamped to the cache's maximum.
//! Nothing runs in the background: expired entries are dropped when read and
//! by [`ResultCache::flush`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use argspec_discovery::cache::{ManualClock, ResultCache};
//!
//! let clock = Arc::new(ManualClock::default());
//! let cache = ResultCache::with_clock(Duration::from_secs(60), clock.clone());
//!
//! cache.put("k", "v", Duration::from_secs(5));
//! assert_eq!(cache.get(&"k"), Some("v"));
//!
//! clock.advance(Duration::from_secs(6));
//! assert_eq!(cache.get(&"k"), None);
//! assert!(cache.is_empty());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += to_delta(by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Process-wide memo table guarded by a mutex.
pub struct ResultCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    max_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> fmt::Debug for ResultCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("max_ttl", &self.max_ttl)
            .finish_non_exhaustive()
    }
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    pub fn new(max_ttl: Duration) -> Self {
        Self::with_clock(max_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(max_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_ttl,
            clock,
        }
    }

    pub fn max_ttl(&self) -> Duration {
        self.max_ttl
    }

    /// Returns the cached value, evicting it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                debug!(key = ?key, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` for `ttl` (clamped to the maximum) and returns it.
    ///
    /// A zero `ttl` returns the value without storing it.
    pub fn put(&self, key: K, value: V, ttl: Duration) -> V {
        let ttl = ttl.min(self.max_ttl);
        if ttl.is_zero() {
            return value;
        }
        let expires_at = self.clock.now() + to_delta(ttl);
        self.lock().insert(
            key,
            Entry {
                value: value.clone(),
                expires_at,
            },
        );
        value
    }

    /// Returns the cached value or computes, stores and returns a new one.
    ///
    /// `compute` runs without the lock held, so concurrent misses on one key
    /// may both compute.
    pub fn get_or_insert_with<F>(&self, key: K, ttl: Duration, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        self.put(key, compute(), ttl)
    }

    /// Drops expired entries, or every entry when `force` is set.
    /// Returns the number removed.
    pub fn flush(&self, force: bool) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        if force {
            entries.clear();
        } else {
            entries.retain(|_, entry| now < entry.expires_at);
        }
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    // Out-of-range durations saturate at a century.
    TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::weeks(5_200))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_cache(max_ttl: u64) -> (Arc<ManualClock>, ResultCache<String, String>) {
        let clock = Arc::new(ManualClock::default());
        let cache = ResultCache::with_clock(Duration::from_secs(max_ttl), clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_put_then_get() {
        let (_, cache) = manual_cache(60);
        let stored = cache.put("k".into(), "v".into(), Duration::from_secs(5));
        assert_eq!(stored, "v");
        assert_eq!(cache.get(&"k".to_string()).as_deref(), Some("v"));
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let (clock, cache) = manual_cache(60);
        cache.put("k".into(), "v".into(), Duration::from_secs(5));

        clock.advance(Duration::from_secs(4));
        assert!(cache.get(&"k".to_string()).is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&"k".to_string()).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_zero_ttl_is_not_stored() {
        let (_, cache) = manual_cache(60);
        assert_eq!(cache.put("k".into(), "v".into(), Duration::ZERO), "v");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_is_clamped_to_maximum() {
        let (clock, cache) = manual_cache(10);
        cache.put("k".into(), "v".into(), Duration::from_secs(3600));
        clock.advance(Duration::from_secs(10));
        assert!(cache.get(&"k".to_string()).is_none());
    }

    #[test]
    fn test_flush_sweeps_expired_or_everything() {
        let (clock, cache) = manual_cache(60);
        cache.put("short".into(), "a".into(), Duration::from_secs(1));
        cache.put("long".into(), "b".into(), Duration::from_secs(30));
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.flush(false), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.flush(true), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_insert_with_computes_once() {
        let (_, cache) = manual_cache(60);
        let mut calls = 0;
        let first = cache.get_or_insert_with("k".into(), Duration::from_secs(5), || {
            calls += 1;
            "v".to_string()
        });
        let second = cache.get_or_insert_with("k".into(), Duration::from_secs(5), || {
            calls += 1;
            "w".to_string()
        });
        assert_eq!((first.as_str(), second.as_str(), calls), ("v", "v", 1));
    }
}
