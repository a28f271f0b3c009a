//! Frequency-capped exposure decisions for promotional prompts.
//!
//! `can_expose` only reads; `record_exposure` is the single mutator and must
//! be called once per exposure actually shown, never per check. Both apply
//! window rollover first.

use std::fmt;
use std::sync::Arc;

use alm_config::ExposureConfig;
use alm_core::Clock;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ExposureError;
use crate::state::ExposureState;
use crate::store::KvStore;

/// Key under which the state is persisted.
pub const STORE_KEY: &str = "paywall-policy:v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExposureCaps {
    pub daily: u32,
    pub weekly: u32,
    pub per_slot_daily: u32,
}

impl Default for ExposureCaps {
    fn default() -> Self {
        Self::from_config(&ExposureConfig::default())
    }
}

impl ExposureCaps {
    #[must_use]
    pub const fn from_config(config: &ExposureConfig) -> Self {
        Self {
            daily: config.daily_cap,
            weekly: config.weekly_cap,
            per_slot_daily: config.per_slot_daily_cap,
        }
    }
}

/// The first cap that blocks an exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapReached {
    Daily,
    Weekly,
    SlotDaily,
}

impl fmt::Display for CapReached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily cap reached",
            Self::Weekly => "weekly cap reached",
            Self::SlotDaily => "per-slot daily cap reached",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub slot: String,
    pub allowed: bool,
    pub blocked_by: Option<CapReached>,
    pub daily_total: u32,
    pub weekly_total: u32,
    pub slot_daily: u32,
}

pub struct ExposureGovernor {
    store: Arc<dyn KvStore>,
    caps: ExposureCaps,
    clock: Arc<dyn Clock>,
    // Serializes record_exposure's read-modify-write.
    write: Mutex<()>,
}

impl ExposureGovernor {
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, caps: ExposureCaps, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            caps,
            clock,
            write: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn caps(&self) -> ExposureCaps {
        self.caps
    }

    /// Whether `slot` may be shown now. Does not persist anything.
    ///
    /// # Errors
    ///
    /// Store I/O failures. A corrupt stored state is treated as empty.
    pub fn can_expose(&self, slot: &str) -> Result<bool, ExposureError> {
        Ok(self.evaluate(slot)?.allowed)
    }

    /// [`Self::can_expose`] with the counters and the blocking cap.
    ///
    /// # Errors
    ///
    /// Store I/O failures.
    pub fn evaluate(&self, slot: &str) -> Result<Decision, ExposureError> {
        let state = self.snapshot()?;
        let slot_daily = state.daily_for(slot);
        let blocked_by = if state.daily_total >= self.caps.daily {
            Some(CapReached::Daily)
        } else if state.weekly_total >= self.caps.weekly {
            Some(CapReached::Weekly)
        } else if slot_daily >= self.caps.per_slot_daily {
            Some(CapReached::SlotDaily)
        } else {
            None
        };
        Ok(Decision {
            slot: slot.to_string(),
            allowed: blocked_by.is_none(),
            blocked_by,
            daily_total: state.daily_total,
            weekly_total: state.weekly_total,
            slot_daily,
        })
    }

    /// Count one rendered exposure of `slot` and persist it.
    ///
    /// # Errors
    ///
    /// Store I/O or serialization failures.
    pub fn record_exposure(&self, slot: &str) -> Result<ExposureState, ExposureError> {
        let _guard = self.write.lock();
        let mut state = self.snapshot()?;
        state.record(slot);
        self.store.set(STORE_KEY, serde_json::to_value(&state)?)?;
        tracing::debug!(
            slot,
            daily_total = state.daily_total,
            weekly_total = state.weekly_total,
            "exposure recorded"
        );
        Ok(state)
    }

    /// Current counters with rollover applied. Nothing is written.
    ///
    /// # Errors
    ///
    /// Store I/O failures.
    pub fn snapshot(&self) -> Result<ExposureState, ExposureError> {
        let now = self.clock.now();
        let stored = match self.store.get(STORE_KEY) {
            Ok(stored) => stored,
            Err(ExposureError::Corrupt { path, reason }) => {
                tracing::warn!(path = %path.display(), %reason, "exposure store unreadable; starting fresh");
                None
            }
            Err(e) => return Err(e),
        };

        let Some(value) = stored else {
            return Ok(ExposureState::fresh(now));
        };
        match serde_json::from_value::<ExposureState>(value) {
            Ok(mut state) => {
                if state.roll_over(now) {
                    tracing::debug!(day = %state.day_key, week = %state.week_key, "exposure windows rolled over");
                }
                Ok(state)
            }
            Err(error) => {
                tracing::warn!(%error, "stored exposure state invalid; starting fresh");
                Ok(ExposureState::fresh(now))
            }
        }
    }

    /// Drop all counters.
    ///
    /// # Errors
    ///
    /// Store I/O failures.
    pub fn reset(&self) -> Result<(), ExposureError> {
        let _guard = self.write.lock();
        self.store.remove(STORE_KEY)
    }
}

impl fmt::Debug for ExposureGovernor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExposureGovernor")
            .field("caps", &self.caps)
            .finish_non_exhaustive()
    }
}
