//! Single-flight registry: concurrent callers for one key share one pending future.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

type Slot<V, E> = Arc<OnceCell<Result<V, E>>>;

/// Deduplicates in-flight work by key.
///
/// The first caller for a key drives its future; callers that arrive while
/// it is pending await the same result. The entry is released once the
/// future resolves, so the next call after that starts a fresh flight.
pub struct SingleFlight<K, V, E> {
    inflight: Mutex<HashMap<K, Slot<V, E>>>,
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key`, or join the flight already running for it.
    ///
    /// # Errors
    ///
    /// Whatever error the shared future resolved with.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = {
            let mut inflight = self.inflight.lock();
            Arc::clone(
                inflight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let result = slot.get_or_init(work).await.clone();

        let mut inflight = self.inflight.lock();
        if inflight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &slot))
        {
            inflight.remove(&key);
        }
        result
    }

    /// Number of keys with a pending flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> std::fmt::Debug for SingleFlight<K, V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.inflight.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_call() {
        let flights: Arc<SingleFlight<&str, u32, String>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = Arc::clone(&flights);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                flights
                    .run("entitlements", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(7)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn entry_is_released_after_completion() {
        let flights: SingleFlight<&str, u32, String> = SingleFlight::new();
        assert_eq!(flights.run("k", || async { Err("boom".to_string()) }).await, Err("boom".into()));
        assert_eq!(flights.in_flight(), 0);
        assert_eq!(flights.run("k", || async { Ok(2) }).await, Ok(2));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_share() {
        let flights: SingleFlight<&str, u32, String> = SingleFlight::new();
        let (a, b) = tokio::join!(
            flights.run("a", || async { Ok(1) }),
            flights.run("b", || async { Ok(2) }),
        );
        assert_eq!((a, b), (Ok(1), Ok(2)));
    }
}
