//! Stale-while-revalidate loading on top of a [`TtlCache`].
//!
//! A cache hit is published immediately and refreshed in the background; a
//! background failure only logs, leaving the published data in place. A miss
//! fetches in the foreground, and only that failure surfaces as an error state.

use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ttl::TtlCache;

/// What a consumer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState<V> {
    pub data: Option<V>,
    /// Set only by a failed foreground fetch.
    pub error: Option<String>,
    /// Foreground fetch pending (nothing cached to show).
    pub loading: bool,
    /// Background refresh of already-shown data pending.
    pub revalidating: bool,
}

impl<V> Default for ViewState<V> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
            revalidating: false,
        }
    }
}

pub struct SwrLoader<K, V> {
    cache: Arc<TtlCache<K, V>>,
    view: Arc<watch::Sender<ViewState<V>>>,
    current: Arc<Mutex<Option<K>>>,
}

impl<K, V> SwrLoader<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(cache: Arc<TtlCache<K, V>>) -> Self {
        let (view, _) = watch::channel(ViewState::default());
        Self {
            cache,
            view: Arc::new(view),
            current: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState<V>> {
        self.view.subscribe()
    }

    #[must_use]
    pub fn view(&self) -> ViewState<V> {
        self.view.borrow().clone()
    }

    /// Load `key`, using `fetch` to revalidate or fill the cache.
    ///
    /// Returns the background task handle on a cache hit, `None` when the
    /// fetch ran in the foreground. A background result for a key that is
    /// no longer current updates the cache but not the view.
    pub async fn load<F, E>(&self, key: K, fetch: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        *self.current.lock() = Some(key.clone());

        if let Some(cached) = self.cache.get(&key) {
            self.view.send_replace(ViewState {
                data: Some(cached),
                error: None,
                loading: false,
                revalidating: true,
            });
            let cache = Arc::clone(&self.cache);
            let view = Arc::clone(&self.view);
            let current = Arc::clone(&self.current);
            return Some(tokio::spawn(async move {
                let result = fetch.await;
                let still_current = current.lock().as_ref() == Some(&key);
                match result {
                    Ok(fresh) => {
                        cache.set(key, fresh.clone());
                        if still_current {
                            view.send_modify(|state| {
                                state.data = Some(fresh);
                                state.revalidating = false;
                            });
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "background revalidation failed; keeping cached data");
                        if still_current {
                            view.send_modify(|state| state.revalidating = false);
                        }
                    }
                }
            }));
        }

        self.view.send_replace(ViewState {
            loading: true,
            ..ViewState::default()
        });
        let next = match fetch.await {
            Ok(fresh) => {
                self.cache.set(key, fresh.clone());
                ViewState {
                    data: Some(fresh),
                    ..ViewState::default()
                }
            }
            Err(error) => {
                tracing::debug!(%error, "foreground fetch failed");
                ViewState {
                    error: Some(error.to_string()),
                    ..ViewState::default()
                }
            }
        };
        self.view.send_replace(next);
        None
    }
}

impl<K, V> std::fmt::Debug for SwrLoader<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwrLoader")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
