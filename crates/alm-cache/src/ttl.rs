//! Per-key TTL cache with a fixed lifetime per instance.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use alm_core::Clock;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    written_at_ms: i64,
}

/// A TTL cache. Writes are last-write-wins; an expired read evicts the entry.
///
/// Age is measured against the injected [`Clock`]. Once an entry has been
/// observed past its TTL it is removed, so a clock that later moves
/// backwards cannot resurrect it.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value if it is still fresh.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.epoch_ms();
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if self.is_expired(entry, now) {
            entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn set(&self, key: K, value: V) {
        let written_at_ms = self.clock.epoch_ms();
        self.entries.lock().insert(
            key,
            Entry {
                value,
                written_at_ms,
            },
        );
    }

    /// Drop the entry for `key`. Returns whether one was present.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, fresh or not yet observed as expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn is_expired(&self, entry: &Entry<V>, now_ms: i64) -> bool {
        let age_ms = i128::from(now_ms) - i128::from(entry.written_at_ms);
        age_ms > i128::try_from(self.ttl.as_millis()).unwrap_or(i128::MAX)
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}
