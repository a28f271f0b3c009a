//! Read-through snapshot cache: TTL-bounded reads with single-flight fetches.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use alm_core::Clock;

use crate::single_flight::SingleFlight;
use crate::ttl::TtlCache;

/// A process-scoped snapshot cache. Created once and never torn down; a miss
/// fetches through a [`SingleFlight`] so concurrent readers issue one request.
#[derive(Debug)]
pub struct SnapshotCache<K, V, E> {
    cache: TtlCache<K, V>,
    flights: SingleFlight<K, V, E>,
}

impl<K, V, E> SnapshotCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: TtlCache::new(ttl, clock),
            flights: SingleFlight::new(),
        }
    }

    /// Return the fresh cached snapshot, or fetch and cache it.
    ///
    /// # Errors
    ///
    /// The fetch error. Failures are not cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.cache.get(&key) {
            return Ok(value);
        }

        let cache_key = key.clone();
        self.flights
            .run(key, || async move {
                let result = fetch().await;
                if let Ok(value) = &result {
                    self.cache.set(cache_key, value.clone());
                }
                result
            })
            .await
    }

    /// Cached value without fetching.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.cache.get(key)
    }

    pub fn invalidate(&self, key: &K) -> bool {
        self.cache.invalidate(key)
    }
}
