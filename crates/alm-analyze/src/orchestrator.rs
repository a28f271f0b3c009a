//! Analyze orchestrator: one outstanding job per entity key.
//!
//! ```text
//! start ──► starting ──► succeeded
//!                    ──► canceled            (cancel(), or teardown)
//!                    ──► failed              (pipeline / auth errors)
//!                    ──► timed_out ──► recovery_polling ──► succeeded
//!                    ──► recovery_polling (409 in progress) ──► gave_up
//! ```
//!
//! Job records live only while active. A terminal transition moves the
//! record's snapshot into `last_outcome` and frees the key.
//!
//! Every commit (cache write plus state change) happens under the jobs lock
//! after re-checking the job's cancellation token. `cancel` and `teardown`
//! fire tokens under the same lock, so a cancellation is either observed
//! before a commit or has no retroactive effect on it.

use std::collections::HashMap;
use std::sync::Arc;

use alm_cache::{CacheKey, ResponseCache};
use alm_config::AlmanacConfig;
use alm_core::{Clock, CoreError, JobStatus, ReportArtifact};
use alm_gateway::{ApiError, ErrorKind};
use chrono::{DateTime, Local, TimeDelta};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::ReportBackend;
use crate::error::{AdmissionDenied, AnalyzeError};
use crate::gate::EntitlementGate;
use crate::poller::{PollOutcome, RecoveryPoller};
use crate::policy::RetryPolicy;

/// Shown while recovering from a start request that timed out.
pub const TIMEOUT_ADVISORY: &str =
    "Report generation is taking longer than usual. We'll keep checking in the background.";

const EVENT_CAPACITY: usize = 64;

/// Terminal snapshots older than a day are pruned when another job finishes.
fn outcome_retention() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub entity_key: String,
    pub status: JobStatus,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    /// Non-blocking notice, not an error.
    pub advisory: Option<String>,
    pub last_error: Option<String>,
    /// Opaque support correlation id from the failing response.
    pub reference_id: Option<String>,
}

/// Broadcast on every state change.
#[derive(Debug, Clone)]
pub struct JobEvent {
    pub job: JobSnapshot,
}

/// What the caller of `start` or `refresh` observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Succeeded(ReportArtifact),
    Canceled,
    /// The result was not observed; a background poller is recovering it.
    Recovering { advisory: Option<String> },
    /// `refresh` only: the report has not been generated yet.
    NotReady,
    Failed {
        message: String,
        reference_id: Option<String>,
        retryable: bool,
    },
}

struct JobRecord {
    snapshot: JobSnapshot,
    cancel: CancellationToken,
}

type Jobs = HashMap<String, JobRecord>;

struct Inner {
    backend: Arc<dyn ReportBackend>,
    gate: Arc<EntitlementGate>,
    cache: Arc<ResponseCache>,
    poller: RecoveryPoller,
    clock: Arc<dyn Clock>,
    locale: String,
    jobs: Mutex<Jobs>,
    outcomes: Mutex<HashMap<String, JobSnapshot>>,
    pollers: Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<JobEvent>,
    root: CancellationToken,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        backend: Arc<dyn ReportBackend>,
        gate: Arc<EntitlementGate>,
        cache: Arc<ResponseCache>,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
        locale: &str,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                poller: RecoveryPoller::new(Arc::clone(&backend), policy),
                backend,
                gate,
                cache,
                clock,
                locale: locale.to_string(),
                jobs: Mutex::new(HashMap::new()),
                outcomes: Mutex::new(HashMap::new()),
                pollers: Mutex::new(Vec::new()),
                events,
                root: CancellationToken::new(),
            }),
        }
    }

    /// Wire the gate, cache, and retry policy from configuration.
    #[must_use]
    pub fn from_config(
        config: &AlmanacConfig,
        backend: Arc<dyn ReportBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let gate = EntitlementGate::new(
            Arc::clone(&backend),
            config.cache.snapshot_ttl(),
            Arc::clone(&clock),
        );
        let cache = alm_cache::response_cache(&config.cache, Arc::clone(&clock));
        Self::new(
            backend,
            Arc::new(gate),
            Arc::new(cache),
            RetryPolicy::from_config(&config.recovery),
            clock,
            &config.general.locale,
        )
    }

    #[must_use]
    pub fn gate(&self) -> &EntitlementGate {
        &self.inner.gate
    }

    /// Start an analyze job for `entity_key`.
    ///
    /// Timeouts and "already in progress" responses are not errors: they
    /// return [`StartOutcome::Recovering`] and hand the job to a background
    /// poller.
    ///
    /// # Errors
    ///
    /// - [`AnalyzeError::AdmissionDenied`] for an active job on this key or
    ///   exhausted quota
    /// - [`AnalyzeError::Unauthenticated`] when no credential resolves
    /// - [`AnalyzeError::ShutDown`] after [`Self::teardown`]
    pub async fn start(&self, entity_key: &str, force: bool) -> Result<StartOutcome, AnalyzeError> {
        self.ensure_idle(entity_key)?;
        self.inner.gate.admit().await?;

        let claim = self.begin(entity_key)?;
        let result = self.inner.backend.analyze(entity_key, force, claim.token()).await;
        let cancel = claim.settle();

        let mut jobs = self.inner.jobs.lock();
        if cancel.is_cancelled() {
            self.finish(&mut jobs, entity_key, JobStatus::Canceled, None)?;
            return Ok(StartOutcome::Canceled);
        }

        let error = match result {
            Ok(artifact) => {
                self.commit(&mut jobs, entity_key, artifact.clone())?;
                return Ok(StartOutcome::Succeeded(artifact));
            }
            Err(error) => error,
        };

        match error.kind() {
            ErrorKind::Timeout => {
                tracing::debug!(entity_key, %error, "analyze timed out; recovering");
                self.advance(&mut jobs, entity_key, JobStatus::TimedOut, None)?;
                self.advance(
                    &mut jobs,
                    entity_key,
                    JobStatus::RecoveryPolling,
                    Some(TIMEOUT_ADVISORY.to_string()),
                )?;
                drop(jobs);
                self.spawn_recovery(entity_key, cancel);
                Ok(StartOutcome::Recovering {
                    advisory: Some(TIMEOUT_ADVISORY.to_string()),
                })
            }
            ErrorKind::InProgress => {
                tracing::debug!(entity_key, "analyze already in progress; recovering");
                self.advance(&mut jobs, entity_key, JobStatus::RecoveryPolling, None)?;
                drop(jobs);
                self.spawn_recovery(entity_key, cancel);
                Ok(StartOutcome::Recovering { advisory: None })
            }
            ErrorKind::Canceled => {
                self.finish(&mut jobs, entity_key, JobStatus::Canceled, None)?;
                Ok(StartOutcome::Canceled)
            }
            _ => self.fail(&mut jobs, entity_key, &error),
        }
    }

    /// Re-read the current report for `entity_key` after a give-up. Uses the
    /// read endpoint, never a fresh analyze call, and skips quota admission.
    ///
    /// # Errors
    ///
    /// - [`AnalyzeError::AdmissionDenied`] for an active job on this key
    /// - [`AnalyzeError::Unauthenticated`] when no credential resolves
    /// - [`AnalyzeError::ShutDown`] after [`Self::teardown`]
    pub async fn refresh(&self, entity_key: &str) -> Result<StartOutcome, AnalyzeError> {
        let claim = self.begin(entity_key)?;
        let result = self.inner.backend.report(entity_key, claim.token()).await;
        let cancel = claim.settle();

        let mut jobs = self.inner.jobs.lock();
        if cancel.is_cancelled() {
            self.finish(&mut jobs, entity_key, JobStatus::Canceled, None)?;
            return Ok(StartOutcome::Canceled);
        }
        match result {
            Ok(artifact) => {
                self.commit(&mut jobs, entity_key, artifact.clone())?;
                Ok(StartOutcome::Succeeded(artifact))
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                self.release(&mut jobs, entity_key);
                Ok(StartOutcome::NotReady)
            }
            Err(error) => self.fail(&mut jobs, entity_key, &error),
        }
    }

    /// Cancel a job that is still starting. Returns whether a cancellation
    /// was issued; recovering or idle jobs are left alone.
    pub fn cancel(&self, entity_key: &str) -> bool {
        let jobs = self.inner.jobs.lock();
        match jobs.get(entity_key) {
            Some(record) if record.snapshot.status == JobStatus::Starting => {
                record.cancel.cancel();
                tracing::debug!(entity_key, "cancel requested");
                true
            }
            _ => false,
        }
    }

    /// Current status; `Idle` when no job is active.
    #[must_use]
    pub fn status(&self, entity_key: &str) -> JobStatus {
        self.inner
            .jobs
            .lock()
            .get(entity_key)
            .map_or(JobStatus::Idle, |record| record.snapshot.status)
    }

    /// Snapshot of the active job, if any.
    #[must_use]
    pub fn job(&self, entity_key: &str) -> Option<JobSnapshot> {
        self.inner
            .jobs
            .lock()
            .get(entity_key)
            .map(|record| record.snapshot.clone())
    }

    /// Snapshot of the most recent terminal job for `entity_key`.
    #[must_use]
    pub fn last_outcome(&self, entity_key: &str) -> Option<JobSnapshot> {
        self.inner.outcomes.lock().get(entity_key).cloned()
    }

    /// The cached artifact for `entity_key` in the configured locale.
    #[must_use]
    pub fn cached(&self, entity_key: &str) -> Option<ReportArtifact> {
        self.inner.cache.get(&self.cache_key(entity_key))
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Wait until `entity_key` has no active job and return its final
    /// snapshot. After teardown, returns the still-active snapshot instead.
    pub async fn wait_settled(&self, entity_key: &str) -> Option<JobSnapshot> {
        let mut events = self.subscribe();
        if !self.status(entity_key).is_active() {
            return self.last_outcome(entity_key);
        }
        loop {
            let received = tokio::select! {
                biased;
                () = self.inner.root.cancelled() => return self.job(entity_key),
                received = events.recv() => received,
            };
            match received {
                Ok(event) if event.job.entity_key == entity_key && !event.job.status.is_active() => {
                    return Some(event.job);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "job events lagged");
                    if !self.status(entity_key).is_active() {
                        return self.last_outcome(entity_key);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return self.last_outcome(entity_key),
            }
        }
    }

    /// Cancel every job and stop every poller. Pollers exit without touching
    /// job state or the cache. Further starts fail with `ShutDown`.
    pub async fn teardown(&self) {
        {
            let _jobs = self.inner.jobs.lock();
            self.inner.root.cancel();
        }
        let handles = std::mem::take(&mut *self.inner.pollers.lock());
        for handle in handles {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "recovery task panicked");
            }
        }
        tracing::debug!("orchestrator torn down");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.root.is_cancelled()
    }

    /// Shared response cache; jobs write recovered and generated reports here.
    #[must_use]
    pub fn response_cache(&self) -> Arc<ResponseCache> {
        Arc::clone(&self.inner.cache)
    }

    /// Cache key for `entity_key` in the configured locale.
    #[must_use]
    pub fn cache_key(&self, entity_key: &str) -> CacheKey {
        CacheKey::new(entity_key, &self.inner.locale)
    }

    fn ensure_idle(&self, entity_key: &str) -> Result<(), AnalyzeError> {
        if self.is_shut_down() {
            return Err(AnalyzeError::ShutDown);
        }
        match self.inner.jobs.lock().get(entity_key) {
            Some(record) => Err(AnalyzeError::AdmissionDenied(AdmissionDenied::JobActive {
                entity_key: entity_key.to_string(),
                status: record.snapshot.status,
            })),
            None => Ok(()),
        }
    }

    /// Claim the key and move it `Idle → Starting`. The previous outcome for
    /// the key is dropped.
    fn begin<'a>(&'a self, entity_key: &'a str) -> Result<Claim<'a>, AnalyzeError> {
        let mut jobs = self.inner.jobs.lock();
        if self.is_shut_down() {
            return Err(AnalyzeError::ShutDown);
        }
        if let Some(record) = jobs.get(entity_key) {
            return Err(AnalyzeError::AdmissionDenied(AdmissionDenied::JobActive {
                entity_key: entity_key.to_string(),
                status: record.snapshot.status,
            }));
        }

        let status = JobStatus::Idle.transition(entity_key, JobStatus::Starting)?;
        let cancel = self.inner.root.child_token();
        let snapshot = JobSnapshot {
            entity_key: entity_key.to_string(),
            status,
            started_at: self.inner.clock.now(),
            finished_at: None,
            advisory: None,
            last_error: None,
            reference_id: None,
        };
        self.inner.outcomes.lock().remove(entity_key);
        self.emit(&snapshot);
        jobs.insert(
            entity_key.to_string(),
            JobRecord {
                snapshot,
                cancel: cancel.clone(),
            },
        );
        tracing::debug!(entity_key, "job starting");
        Ok(Claim {
            orchestrator: self,
            entity_key,
            cancel,
            settled: false,
        })
    }

    fn advance(
        &self,
        jobs: &mut Jobs,
        entity_key: &str,
        next: JobStatus,
        advisory: Option<String>,
    ) -> Result<(), CoreError> {
        let record = jobs
            .get_mut(entity_key)
            .ok_or_else(|| CoreError::Validation(format!("no active job for {entity_key}")))?;
        record.snapshot.status = record.snapshot.status.transition(entity_key, next)?;
        record.snapshot.advisory = advisory;
        tracing::debug!(entity_key, status = %next, "job advanced");
        self.emit(&record.snapshot);
        Ok(())
    }

    /// Terminal transition: record the outcome and free the key.
    fn finish(
        &self,
        jobs: &mut Jobs,
        entity_key: &str,
        next: JobStatus,
        error: Option<&ApiError>,
    ) -> Result<(), CoreError> {
        let mut record = jobs
            .remove(entity_key)
            .ok_or_else(|| CoreError::Validation(format!("no active job for {entity_key}")))?;
        let status = match record.snapshot.status.transition(entity_key, next) {
            Ok(status) => status,
            Err(invalid) => {
                jobs.insert(entity_key.to_string(), record);
                return Err(invalid);
            }
        };

        let snapshot = &mut record.snapshot;
        snapshot.status = status;
        snapshot.advisory = None;
        snapshot.finished_at = Some(self.inner.clock.now());
        if let Some(error) = error {
            snapshot.last_error = Some(error.user_message());
            snapshot.reference_id = error.reference_id().map(str::to_string);
        }
        tracing::info!(
            entity_key,
            status = %status,
            reference_id = snapshot.reference_id.as_deref().unwrap_or(""),
            "analyze job finished"
        );

        let finished_at = self.inner.clock.now();
        let mut outcomes = self.inner.outcomes.lock();
        outcomes.retain(|_, outcome| {
            outcome
                .finished_at
                .is_some_and(|at| finished_at - at < outcome_retention())
        });
        outcomes.insert(entity_key.to_string(), record.snapshot.clone());
        drop(outcomes);
        self.emit(&record.snapshot);
        Ok(())
    }

    /// Free the key without a terminal outcome (refresh found nothing yet).
    fn release(&self, jobs: &mut Jobs, entity_key: &str) {
        if let Some(mut record) = jobs.remove(entity_key) {
            record.snapshot.status = JobStatus::Idle;
            tracing::debug!(entity_key, "report not ready; released");
            self.emit(&record.snapshot);
        }
    }

    fn commit(
        &self,
        jobs: &mut Jobs,
        entity_key: &str,
        artifact: ReportArtifact,
    ) -> Result<(), CoreError> {
        self.inner.cache.set(self.cache_key(entity_key), artifact);
        self.finish(jobs, entity_key, JobStatus::Succeeded, None)?;
        self.inner.gate.invalidate();
        Ok(())
    }

    fn fail(
        &self,
        jobs: &mut Jobs,
        entity_key: &str,
        error: &ApiError,
    ) -> Result<StartOutcome, AnalyzeError> {
        self.finish(jobs, entity_key, JobStatus::Failed, Some(error))?;
        if error.kind() == ErrorKind::Unauthenticated {
            return Err(AnalyzeError::Unauthenticated);
        }
        Ok(StartOutcome::Failed {
            message: error.user_message(),
            reference_id: error.reference_id().map(str::to_string),
            retryable: error.is_retryable(),
        })
    }

    fn spawn_recovery(&self, entity_key: &str, cancel: CancellationToken) {
        let this = self.clone();
        let entity_key = entity_key.to_string();
        let handle = tokio::spawn(async move { this.recover(&entity_key, &cancel).await });

        let mut pollers = self.inner.pollers.lock();
        pollers.retain(|handle| !handle.is_finished());
        pollers.push(handle);
    }

    async fn recover(&self, entity_key: &str, cancel: &CancellationToken) {
        let outcome = self.inner.poller.poll(entity_key, cancel).await;

        let mut jobs = self.inner.jobs.lock();
        if cancel.is_cancelled() {
            tracing::debug!(entity_key, "recovery canceled; leaving state untouched");
            return;
        }
        let committed = match outcome {
            PollOutcome::Recovered { artifact, attempts } => {
                tracing::debug!(entity_key, attempts, "recovered report");
                self.commit(&mut jobs, entity_key, artifact)
            }
            PollOutcome::GaveUp {
                attempts,
                last_error,
            } => {
                tracing::debug!(entity_key, attempts, "recovery gave up");
                self.finish(&mut jobs, entity_key, JobStatus::GaveUp, last_error.as_ref())
            }
            PollOutcome::Stopped => Ok(()),
        };
        if let Err(error) = committed {
            tracing::warn!(entity_key, %error, "could not commit recovery result");
        }
    }

    fn emit(&self, snapshot: &JobSnapshot) {
        // No subscribers is fine.
        let _ = self.inner.events.send(JobEvent {
            job: snapshot.clone(),
        });
    }
}

/// A `Starting` job owned by an in-flight `start` or `refresh` call.
///
/// Dropped unsettled (the caller's future went away mid-request), it fires
/// the job token and finishes a still-`Starting` record as `Canceled`.
struct Claim<'a> {
    orchestrator: &'a Orchestrator,
    entity_key: &'a str,
    cancel: CancellationToken,
    settled: bool,
}

impl Claim<'_> {
    const fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The request returned; the caller commits from here.
    fn settle(mut self) -> CancellationToken {
        self.settled = true;
        self.cancel.clone()
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let orchestrator = self.orchestrator;
        let mut jobs = orchestrator.inner.jobs.lock();
        self.cancel.cancel();
        let starting = jobs
            .get(self.entity_key)
            .is_some_and(|record| record.snapshot.status == JobStatus::Starting);
        if !starting {
            return;
        }
        tracing::debug!(entity_key = self.entity_key, "caller went away; canceling job");
        if let Err(error) = orchestrator.finish(&mut jobs, self.entity_key, JobStatus::Canceled, None) {
            tracing::warn!(entity_key = self.entity_key, %error, "could not cancel abandoned job");
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("locale", &self.inner.locale)
            .field("active_jobs", &self.inner.jobs.lock().len())
            .field("shut_down", &self.inner.root.is_cancelled())
            .finish_non_exhaustive()
    }
}
