//! Time-bounded cache for external handles a controller resolves by lookup.
//!
//! Failed lookups are cached too, so a missing target costs one resolution
//! per TTL rather than one per tick.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::trace;

/// Default time-to-live for cached handles.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct Entry<V> {
    value: Option<V>,
    refreshed_at: Instant,
}

/// Cache keyed by lookup query, storing the resolved handle or its absence.
#[derive(Debug, Clone)]
pub struct ResourceCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

impl<K, V> ResourceCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key`, resolving it first if missing or stale.
    pub fn get<F>(&mut self, key: &K, resolve: F) -> Option<&V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        self.get_at(key, Instant::now(), resolve)
    }

    /// [`ResourceCache::get`] with an explicit clock reading.
    pub fn get_at<F>(&mut self, key: &K, now: Instant, resolve: F) -> Option<&V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        let stale = match self.entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.refreshed_at) >= self.ttl,
            None => true,
        };
        if stale {
            let value = resolve(key);
            trace!(?key, found = value.is_some(), "Resource refreshed");
            self.entries.insert(
                key.clone(),
                Entry {
                    value,
                    refreshed_at: now,
                },
            );
        }
        self.entries.get(key).and_then(|entry| entry.value.as_ref())
    }

    /// Force the next `get` for `key` to resolve again.
    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_within_ttl_resolves_once() {
        let mut cache: ResourceCache<&str, u32> = ResourceCache::new(Duration::from_secs(5));
        let calls = Cell::new(0);
        let start = Instant::now();

        let resolve = |_: &&str| {
            calls.set(calls.get() + 1);
            Some(7)
        };
        assert_eq!(cache.get_at(&"chat", start, resolve), Some(&7));
        assert_eq!(
            cache.get_at(&"chat", start + Duration::from_millis(4999), resolve),
            Some(&7)
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn get_reads_the_clock() {
        let mut cache: ResourceCache<&str, u32> = ResourceCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        let resolve = |_: &&str| {
            calls.set(calls.get() + 1);
            None
        };
        assert_eq!(cache.get(&"lamp", resolve), None);
        assert_eq!(cache.get(&"lamp", resolve), None);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn get_after_ttl_resolves_again() {
        let mut cache: ResourceCache<&str, u32> = ResourceCache::new(Duration::from_secs(5));
        let calls = Cell::new(0u32);
        let start = Instant::now();
        let resolve = |_: &&str| {
            calls.set(calls.get() + 1);
            Some(calls.get())
        };

        assert_eq!(cache.get_at(&"game", start, resolve), Some(&1));
        assert_eq!(
            cache.get_at(&"game", start + Duration::from_secs(5), resolve),
            Some(&2)
        );
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn absent_is_cached_for_ttl() {
        let mut cache: ResourceCache<&str, u32> = ResourceCache::new(Duration::from_secs(5));
        let calls = Cell::new(0);
        let start = Instant::now();
        let resolve = |_: &&str| {
            calls.set(calls.get() + 1);
            None
        };

        for ms in [0, 10, 1000, 4000] {
            assert_eq!(
                cache.get_at(&"lamp", start + Duration::from_millis(ms), resolve),
                None
            );
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn invalidate_forces_refresh() {
        let mut cache: ResourceCache<&str, u32> = ResourceCache::new(Duration::from_secs(5));
        let calls = Cell::new(0);
        let now = Instant::now();
        let resolve = |_: &&str| {
            calls.set(calls.get() + 1);
            Some(1)
        };

        cache.get_at(&"lamp", now, resolve);
        cache.invalidate(&"lamp");
        cache.get_at(&"lamp", now, resolve);
        assert_eq!(calls.get(), 2);

        cache.clear();
        cache.get_at(&"lamp", now, resolve);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn keys_are_independent() {
        let mut cache: ResourceCache<String, String> = ResourceCache::new(DEFAULT_TTL);
        let now = Instant::now();
        cache.get_at(&"a".to_string(), now, |k| Some(format!("{k}-1")));
        cache.get_at(&"b".to_string(), now, |k| Some(format!("{k}-1")));
        assert_eq!(
            cache.get_at(&"a".to_string(), now, |_| None).cloned(),
            Some("a-1".to_string())
        );
    }
}
