use std::fmt;

use alm_core::{CoreError, JobStatus};
use thiserror::Error;

/// Why a start was refused before any request was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDenied {
    /// Non-pro plan with no analyze runs left today.
    QuotaExhausted {
        plan: String,
        daily_limit: Option<u32>,
    },
    /// A job for this key is already starting or recovering.
    JobActive {
        entity_key: String,
        status: JobStatus,
    },
}

impl AdmissionDenied {
    /// Short actionable prompt for the user.
    #[must_use]
    pub const fn prompt(&self) -> &'static str {
        match self {
            Self::QuotaExhausted { .. } => "upgrade your plan or try again tomorrow",
            Self::JobActive { .. } => "wait for the running report to finish",
        }
    }
}

impl fmt::Display for AdmissionDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExhausted {
                plan,
                daily_limit: Some(limit),
            } => write!(f, "daily analyze limit of {limit} reached on the {plan} plan"),
            Self::QuotaExhausted { plan, .. } => {
                write!(f, "no analyze runs left today on the {plan} plan")
            }
            Self::JobActive { entity_key, status } => {
                write!(f, "a job for {entity_key} is already {status}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Not authenticated: sign in and try again")]
    Unauthenticated,

    #[error("Analyze not admitted: {0}")]
    AdmissionDenied(AdmissionDenied),

    #[error(transparent)]
    Transition(#[from] CoreError),

    #[error("Orchestrator has been torn down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_message_names_limit() {
        let denied = AdmissionDenied::QuotaExhausted {
            plan: "free".into(),
            daily_limit: Some(3),
        };
        assert_eq!(
            AnalyzeError::AdmissionDenied(denied).to_string(),
            "Analyze not admitted: daily analyze limit of 3 reached on the free plan"
        );
    }

    #[test]
    fn job_active_message_names_status() {
        let denied = AdmissionDenied::JobActive {
            entity_key: "2026-03-02".into(),
            status: JobStatus::RecoveryPolling,
        };
        assert_eq!(
            denied.to_string(),
            "a job for 2026-03-02 is already recovery_polling"
        );
        assert_eq!(denied.prompt(), "wait for the running report to finish");
    }
}
