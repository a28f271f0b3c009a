//! # alm-analyze
//!
//! Orchestration of long-running analyze (report generation) jobs:
//!
//! - [`EntitlementGate`]: quota admission from TTL-cached, single-flight
//!   entitlement and activation snapshots
//! - [`Orchestrator`]: per-key job state machine with cooperative cancellation
//! - [`RecoveryPoller`]: bounded background reads when a start request could
//!   not observe its result
//! - [`RetryPolicy`]: fixed-delay attempts with a cancellation stop signal
//!
//! Soft failures (timeouts, "already in progress") never reach callers as
//! errors; they become [`StartOutcome::Recovering`].

pub mod backend;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod poller;
pub mod policy;

pub use backend::ReportBackend;
pub use error::{AdmissionDenied, AnalyzeError};
pub use gate::EntitlementGate;
pub use orchestrator::{JobEvent, JobSnapshot, Orchestrator, StartOutcome, TIMEOUT_ADVISORY};
pub use poller::{PollOutcome, RecoveryPoller};
pub use policy::{RetryOutcome, RetryPolicy};
