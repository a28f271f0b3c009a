//! Promotional exposure caps.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const fn default_daily_cap() -> u32 {
    3
}

const fn default_weekly_cap() -> u32 {
    12
}

const fn default_per_slot_daily_cap() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExposureConfig {
    /// Total exposures across all slots per local calendar day.
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,

    /// Total exposures across all slots per ISO week.
    #[serde(default = "default_weekly_cap")]
    pub weekly_cap: u32,

    /// Exposures of a single slot per local calendar day.
    #[serde(default = "default_per_slot_daily_cap")]
    pub per_slot_daily_cap: u32,

    /// Durable store location. Empty means the platform data directory.
    #[serde(default)]
    pub store_path: String,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            daily_cap: default_daily_cap(),
            weekly_cap: default_weekly_cap(),
            per_slot_daily_cap: default_per_slot_daily_cap(),
            store_path: String::new(),
        }
    }
}

impl ExposureConfig {
    /// Resolve the store path, falling back to `<data_dir>/almanac/exposure.json`.
    #[must_use]
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        if !self.store_path.is_empty() {
            return Some(PathBuf::from(&self.store_path));
        }
        dirs::data_dir().map(|d| d.join("almanac").join("exposure.json"))
    }
}
