//! Durable exposure counters.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::window::{day_key, week_key};

/// Day- and week-scoped counters. Counters are unsigned and only ever
/// incremented or reset to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureState {
    pub day_key: String,
    pub week_key: String,
    pub daily_total: u32,
    pub weekly_total: u32,
    #[serde(default)]
    pub daily_by_slot: BTreeMap<String, u32>,
    #[serde(default)]
    pub weekly_by_slot: BTreeMap<String, u32>,
}

impl ExposureState {
    /// Zeroed counters for the windows containing `now`.
    #[must_use]
    pub fn fresh(now: DateTime<Local>) -> Self {
        Self {
            day_key: day_key(now),
            week_key: week_key(now),
            ..Self::default()
        }
    }

    /// Reset whichever windows `now` has left. Returns whether anything changed.
    pub fn roll_over(&mut self, now: DateTime<Local>) -> bool {
        let mut changed = false;

        let day = day_key(now);
        if self.day_key != day {
            self.day_key = day;
            self.daily_total = 0;
            self.daily_by_slot.clear();
            changed = true;
        }

        let week = week_key(now);
        if self.week_key != week {
            self.week_key = week;
            self.weekly_total = 0;
            self.weekly_by_slot.clear();
            changed = true;
        }

        changed
    }

    #[must_use]
    pub fn daily_for(&self, slot: &str) -> u32 {
        self.daily_by_slot.get(slot).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn weekly_for(&self, slot: &str) -> u32 {
        self.weekly_by_slot.get(slot).copied().unwrap_or(0)
    }

    /// Count one exposure of `slot` in both windows.
    pub fn record(&mut self, slot: &str) {
        self.daily_total = self.daily_total.saturating_add(1);
        self.weekly_total = self.weekly_total.saturating_add(1);
        let daily = self.daily_by_slot.entry(slot.to_string()).or_insert(0);
        *daily = daily.saturating_add(1);
        let weekly = self.weekly_by_slot.entry(slot.to_string()).or_insert(0);
        *weekly = weekly.saturating_add(1);
    }
}
