//! Recovery poller: bounded reads of the current artifact after the start
//! request could not observe a result.
//!
//! The poller only reads. Committing a recovered artifact (cache write and
//! state transition) is the orchestrator's job, which lets it check the
//! cancellation token and commit under one lock.

use std::sync::Arc;

use alm_core::ReportArtifact;
use alm_gateway::{ApiError, ErrorKind};
use tokio_util::sync::CancellationToken;

use crate::backend::ReportBackend;
use crate::policy::{RetryOutcome, RetryPolicy};

#[derive(Debug)]
pub enum PollOutcome {
    Recovered {
        artifact: ReportArtifact,
        attempts: u32,
    },
    GaveUp {
        attempts: u32,
        last_error: Option<ApiError>,
    },
    Stopped,
}

#[derive(Clone)]
pub struct RecoveryPoller {
    backend: Arc<dyn ReportBackend>,
    policy: RetryPolicy,
}

impl RecoveryPoller {
    #[must_use]
    pub fn new(backend: Arc<dyn ReportBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll `GET /api/reports` for `entity_key` until it succeeds, the
    /// attempts run out, or `cancel` fires. A 404 ("not generated yet")
    /// consumes an attempt like any other failure.
    pub async fn poll(&self, entity_key: &str, cancel: &CancellationToken) -> PollOutcome {
        let outcome = self
            .policy
            .run(cancel, |attempt| {
                tracing::debug!(entity_key, attempt, "recovery read");
                self.backend.report(entity_key, cancel)
            })
            .await;

        match outcome {
            RetryOutcome::Succeeded { value, attempts } => PollOutcome::Recovered {
                artifact: value,
                attempts,
            },
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                if let Some(error) = &last_error
                    && error.kind() != ErrorKind::NotFound
                {
                    tracing::debug!(entity_key, %error, "last recovery read failed");
                }
                PollOutcome::GaveUp {
                    attempts,
                    last_error,
                }
            }
            RetryOutcome::Stopped { attempts } => {
                tracing::debug!(entity_key, attempts, "recovery stopped");
                PollOutcome::Stopped
            }
        }
    }
}

impl std::fmt::Debug for RecoveryPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryPoller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
