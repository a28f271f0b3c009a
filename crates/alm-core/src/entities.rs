//! Wire entities consumed from the Almanac REST API.
//!
//! Every field decodes leniently (see [`crate::lenient`]): a partially
//! malformed payload still yields a fully-typed value.

use serde::{Deserialize, Serialize};

use crate::lenient::{lenient, lenient_opt, lenient_seq};

/// Current report schema version assumed when the payload omits one.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

const fn default_version() -> u32 {
    REPORT_SCHEMA_VERSION
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A generated report for one entity key (a calendar date).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportArtifact {
    /// Entity key, `YYYY-MM-DD`.
    #[serde(default, deserialize_with = "lenient")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient")]
    pub report: Report,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default = "default_version", deserialize_with = "version")]
    pub version: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub highlights: Vec<String>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub insights: Vec<Insight>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub tomorrow_routine: Vec<RoutineItem>,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            version: REPORT_SCHEMA_VERSION,
            summary: String::new(),
            highlights: Vec::new(),
            insights: Vec::new(),
            tomorrow_routine: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub detail: String,
}

/// One suggested block in the next day's routine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineItem {
    #[serde(default, deserialize_with = "lenient")]
    pub time: String,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub goal: String,
}

fn version<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let parsed: Option<u32> = lenient_opt(deserializer)?;
    Ok(parsed.unwrap_or(REPORT_SCHEMA_VERSION))
}

// ---------------------------------------------------------------------------
// Entitlements
// ---------------------------------------------------------------------------

/// Read-only plan snapshot used for admission decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    #[serde(default = "default_plan", deserialize_with = "plan")]
    pub plan: String,
    #[serde(default, deserialize_with = "lenient")]
    pub is_pro: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub analyze_used_today: u32,
    /// `None` when the server did not report a remaining count.
    #[serde(default, deserialize_with = "lenient_opt")]
    pub analyze_remaining_today: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub limits: Limits,
}

impl Default for Entitlement {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            is_pro: false,
            analyze_used_today: 0,
            analyze_remaining_today: None,
            limits: Limits::default(),
        }
    }
}

impl Entitlement {
    /// Non-pro plan with a known remaining count of zero.
    #[must_use]
    pub fn quota_exhausted(&self) -> bool {
        !self.is_pro && self.analyze_remaining_today == Some(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub daily_analyze_limit: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub report_retention_days: Option<u32>,
}

fn default_plan() -> String {
    "free".to_string()
}

fn plan<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let parsed: Option<String> = lenient_opt(deserializer)?;
    Ok(parsed.filter(|p| !p.trim().is_empty()).unwrap_or_else(default_plan))
}

// ---------------------------------------------------------------------------
// Activation
// ---------------------------------------------------------------------------

/// Onboarding progress snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    #[serde(default, deserialize_with = "lenient")]
    pub profile_complete: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub has_any_log: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub has_any_report: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub activation_complete: bool,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub next_step: Option<String>,
}
