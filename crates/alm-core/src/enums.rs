//! Status enums for analyze jobs.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `JobStatus` provides `allowed_next_states()` so the orchestrator can enforce
//! valid transitions at the application layer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Status of an analyze job for a single entity key.
///
/// ```text
/// idle → starting → succeeded
///                 → canceled
///                 → failed
///                 → timed_out → recovery_polling → succeeded
///                 → recovery_polling             → gave_up
/// ```
///
/// Terminal states release the job record, which returns the key to `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    Starting,
    Succeeded,
    Canceled,
    TimedOut,
    RecoveryPolling,
    Failed,
    GaveUp,
}

impl JobStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::Starting],
            Self::Starting => &[
                Self::Succeeded,
                Self::Canceled,
                Self::Failed,
                Self::TimedOut,
                Self::RecoveryPolling,
            ],
            Self::TimedOut => &[Self::RecoveryPolling],
            Self::RecoveryPolling => &[Self::Succeeded, Self::GaveUp],
            Self::Succeeded | Self::Canceled | Self::Failed | Self::GaveUp => &[Self::Idle],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Validate a transition for `entity_key`, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] if `next` is not reachable from `self`.
    pub fn transition(self, entity_key: &str, next: Self) -> Result<Self, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                entity_key: entity_key.to_string(),
                from: self,
                to: next,
            })
        }
    }

    /// A job in this state holds the per-key slot; a second start is rejected.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::TimedOut | Self::RecoveryPolling)
    }

    /// Terminal states release the job record.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Canceled | Self::Failed | Self::GaveUp
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
            Self::TimedOut => "timed_out",
            Self::RecoveryPolling => "recovery_polling",
            Self::Failed => "failed",
            Self::GaveUp => "gave_up",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
