// crates/substrate-adapters/src/cache.rs
// ============================================================================
// Module: Adapter Cache
// Description: Caches materialized adapters keyed by (route.id, route.updated_at).
// Purpose: Avoid re-materializing an adapter on every resolution while still
//          invalidating immediately when the backing route changes.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! The adapter cache is one of the few permitted pieces of shared mutable
//! state (see the concurrency model): it is safe under concurrent read and
//! uses a single-writer discipline (a `Mutex`) on insertion. A route change
//! produces a new `updated_at`, which is part of the cache key, so a stale
//! entry is never returned — it simply misses and gets rebuilt.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use substrate_core::RouteId;
use substrate_core::Timestamp;

/// Cache key: the route's stable id plus its last-modified timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    route_id: RouteId,
    updated_at: i64,
}

/// A concurrency-safe cache of materialized adapters of type `T`, keyed by
/// `(route.id, route.updated_at)`.
pub struct AdapterCache<T> {
    entries: Mutex<HashMap<CacheKey, Arc<T>>>,
}

impl<T> Default for AdapterCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> AdapterCache<T> {
    /// Creates an empty adapter cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached adapter for `(route_id, updated_at)`, materializing
    /// it via `build` on a cache miss.
    ///
    /// # Errors
    ///
    /// Propagates any error `build` returns; nothing is cached on failure.
    pub fn get_or_build<E>(
        &self,
        route_id: &RouteId,
        updated_at: Timestamp,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        let key = CacheKey {
            route_id: route_id.clone(),
            updated_at: updated_at.as_unix_millis(),
        };
        {
            // Poisoned mutex means a prior panic happened under the lock; treat
            // the cache as empty rather than propagating the poison.
            let guard = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(existing) = guard.get(&key) {
                return Ok(Arc::clone(existing));
            }
        }
        let built = Arc::new(build()?);
        let mut guard = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.retain(|k, _| k.route_id != key.route_id || k.updated_at == key.updated_at);
        guard.insert(key, Arc::clone(&built));
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hits_on_same_key() {
        let cache: AdapterCache<u32> = AdapterCache::new();
        let route_id = RouteId::new("r1");
        let ts = Timestamp::from_unix_millis(100);
        let mut builds = 0;
        let first = cache
            .get_or_build::<std::convert::Infallible>(&route_id, ts, || {
                builds += 1;
                Ok(42)
            })
            .unwrap_or_else(|_| unreachable!("build is infallible"));
        let second = cache
            .get_or_build::<std::convert::Infallible>(&route_id, ts, || {
                builds += 1;
                Ok(42)
            })
            .unwrap_or_else(|_| unreachable!("build is infallible"));
        assert_eq!(*first, *second);
        assert_eq!(builds, 1);
    }

    #[test]
    fn cache_misses_when_updated_at_changes() {
        let cache: AdapterCache<u32> = AdapterCache::new();
        let route_id = RouteId::new("r1");
        let mut builds = 0;
        let _ = cache
            .get_or_build::<std::convert::Infallible>(&route_id, Timestamp::from_unix_millis(100), || {
                builds += 1;
                Ok(1)
            })
            .unwrap_or_else(|_| unreachable!("build is infallible"));
        let _ = cache
            .get_or_build::<std::convert::Infallible>(&route_id, Timestamp::from_unix_millis(200), || {
                builds += 1;
                Ok(2)
            })
            .unwrap_or_else(|_| unreachable!("build is infallible"));
        assert_eq!(builds, 2);
    }
}
