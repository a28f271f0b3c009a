//! Recovery poller settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const fn default_max_attempts() -> u32 {
    6
}

const fn default_delay_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecoveryConfig {
    /// Maximum read attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay before each attempt. No backoff.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl RecoveryConfig {
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}
