//! # alm-exposure
//!
//! Exposure policy for promotional prompts (paywall and upgrade CTAs).
//!
//! Counters are kept per local calendar day and per ISO-8601 week, both in
//! total and per slot, and persisted under [`STORE_KEY`] in a [`KvStore`].
//! Default caps: 3 per day, 12 per week, 2 per slot per day.

pub mod error;
pub mod governor;
pub mod state;
pub mod store;
pub mod window;

use std::sync::Arc;

use alm_config::ExposureConfig;
use alm_core::Clock;

pub use error::ExposureError;
pub use governor::{CapReached, Decision, ExposureCaps, ExposureGovernor, STORE_KEY};
pub use state::ExposureState;
pub use store::{FileKvStore, KvStore, MemoryKvStore};

/// Governor over the configured file store and caps.
///
/// # Errors
///
/// Returns [`ExposureError::NoStorePath`] when no store path is configured
/// and the platform has no data directory.
pub fn from_config(
    config: &ExposureConfig,
    clock: Arc<dyn Clock>,
) -> Result<ExposureGovernor, ExposureError> {
    let path = config
        .resolved_store_path()
        .ok_or(ExposureError::NoStorePath)?;
    Ok(ExposureGovernor::new(
        Arc::new(FileKvStore::new(path)),
        ExposureCaps::from_config(config),
        clock,
    ))
}
