//! # alm-cache
//!
//! Client-side caching for Almanac:
//! - [`TtlCache`]: per-key TTL cache, evicting on expired reads
//! - [`ResponseCache`]: report artifacts keyed by `(entity_key, locale)`
//! - [`SingleFlight`]: in-flight request de-duplication
//! - [`SnapshotCache`]: read-through TTL cache fronted by a single-flight registry
//! - [`SwrLoader`]: stale-while-revalidate view loading

pub mod single_flight;
pub mod snapshot;
pub mod swr;
pub mod ttl;

use std::sync::Arc;

use alm_config::CacheConfig;
use alm_core::{Clock, ReportArtifact};

pub use single_flight::SingleFlight;
pub use snapshot::SnapshotCache;
pub use swr::{SwrLoader, ViewState};
pub use ttl::TtlCache;

/// Response cache key. The same date renders differently per locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub entity_key: String,
    pub locale: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(entity_key: &str, locale: &str) -> Self {
        Self {
            entity_key: entity_key.to_string(),
            locale: locale.to_string(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.entity_key, self.locale)
    }
}

/// Session-scoped cache of report artifacts.
pub type ResponseCache = TtlCache<CacheKey, ReportArtifact>;

/// Build the response cache with the configured (clamped) report TTL.
#[must_use]
pub fn response_cache(config: &CacheConfig, clock: Arc<dyn Clock>) -> ResponseCache {
    TtlCache::new(config.report_ttl(), clock)
}
