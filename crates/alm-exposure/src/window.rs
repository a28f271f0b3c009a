//! Counter window keys.

use chrono::{DateTime, Datelike, Local};

/// Local calendar day, `YYYY-MM-DD`.
#[must_use]
pub fn day_key(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// ISO-8601 week (Monday start), `YYYY-Www`. The year is the ISO week-year,
/// which differs from the calendar year around New Year.
#[must_use]
pub fn week_key(now: DateTime<Local>) -> String {
    let week = now.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}
