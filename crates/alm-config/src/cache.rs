//! Response and snapshot cache lifetimes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Report cache TTL bounds, in seconds (5 to 10 minutes).
pub const REPORT_TTL_BOUNDS: (u64, u64) = (300, 600);

const fn default_report_ttl_secs() -> u64 {
    300
}

const fn default_snapshot_ttl_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL for cached report artifacts. Clamped to [`REPORT_TTL_BOUNDS`].
    #[serde(default = "default_report_ttl_secs")]
    pub report_ttl_secs: u64,

    /// TTL for entitlement/activation snapshots.
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            report_ttl_secs: default_report_ttl_secs(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn report_ttl(&self) -> Duration {
        let (lo, hi) = REPORT_TTL_BOUNDS;
        Duration::from_secs(self.report_ttl_secs.clamp(lo, hi))
    }

    #[must_use]
    pub const fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }
}
