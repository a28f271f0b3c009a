//! Entitlement/activation admission gate.

use std::sync::Arc;
use std::time::Duration;

use alm_cache::SnapshotCache;
use alm_core::{Activation, Clock, Entitlement};
use alm_gateway::{ApiError, ErrorKind};

use crate::backend::ReportBackend;
use crate::error::{AdmissionDenied, AnalyzeError};

const SNAPSHOT_KEY: &str = "me";

/// Process-scoped snapshot holder. Reads are TTL-bounded and concurrent
/// misses share one request.
pub struct EntitlementGate {
    backend: Arc<dyn ReportBackend>,
    entitlements: SnapshotCache<&'static str, Entitlement, ApiError>,
    activation: SnapshotCache<&'static str, Activation, ApiError>,
}

impl EntitlementGate {
    #[must_use]
    pub fn new(backend: Arc<dyn ReportBackend>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            entitlements: SnapshotCache::new(ttl, Arc::clone(&clock)),
            activation: SnapshotCache::new(ttl, clock),
        }
    }

    /// # Errors
    ///
    /// The fetch error on a cache miss.
    pub async fn entitlement(&self) -> Result<Entitlement, ApiError> {
        self.entitlements
            .get_or_fetch(SNAPSHOT_KEY, || self.backend.entitlements())
            .await
    }

    /// # Errors
    ///
    /// The fetch error on a cache miss.
    pub async fn activation(&self) -> Result<Activation, ApiError> {
        self.activation
            .get_or_fetch(SNAPSHOT_KEY, || self.backend.activation())
            .await
    }

    /// Decide whether a new analyze run may start.
    ///
    /// An unreachable entitlement endpoint admits the run; the server
    /// enforces quota regardless.
    ///
    /// # Errors
    ///
    /// - [`AnalyzeError::AdmissionDenied`] when the quota is exhausted
    /// - [`AnalyzeError::Unauthenticated`] when no credential resolves
    pub async fn admit(&self) -> Result<(), AnalyzeError> {
        match self.entitlement().await {
            Ok(entitlement) if entitlement.quota_exhausted() => {
                tracing::debug!(plan = %entitlement.plan, "analyze quota exhausted");
                Err(AnalyzeError::AdmissionDenied(
                    AdmissionDenied::QuotaExhausted {
                        plan: entitlement.plan,
                        daily_limit: entitlement.limits.daily_analyze_limit,
                    },
                ))
            }
            Ok(_) => Ok(()),
            Err(error) if error.kind() == ErrorKind::Unauthenticated => {
                Err(AnalyzeError::Unauthenticated)
            }
            Err(error) => {
                tracing::warn!(%error, "entitlement snapshot unavailable; admitting");
                Ok(())
            }
        }
    }

    /// Forget both snapshots, e.g. after a run consumed quota.
    pub fn invalidate(&self) {
        self.entitlements.invalidate(&SNAPSHOT_KEY);
        self.activation.invalidate(&SNAPSHOT_KEY);
    }
}

impl std::fmt::Debug for EntitlementGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementGate").finish_non_exhaustive()
    }
}
