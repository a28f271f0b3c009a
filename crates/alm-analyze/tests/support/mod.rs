//! Scripted backend for orchestrator tests. Delays run on tokio time, so
//! tests use a paused clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use alm_analyze::{EntitlementGate, Orchestrator, ReportBackend, RetryPolicy};
use alm_cache::response_cache;
use alm_config::CacheConfig;
use alm_core::{Activation, Clock, Entitlement, FakeClock, Report, ReportArtifact};
use alm_gateway::{ANALYZE_IN_PROGRESS, ApiError, ErrorBody};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

pub struct Scripted {
    pub delay: Duration,
    pub result: Result<ReportArtifact, ApiError>,
    /// When false the response arrives even after cancellation.
    pub honor_cancel: bool,
}

impl Scripted {
    pub fn ok(date: &str) -> Self {
        Self::after(Duration::ZERO, Ok(artifact(date)))
    }

    pub fn err(error: ApiError) -> Self {
        Self::after(Duration::ZERO, Err(error))
    }

    pub const fn after(delay: Duration, result: Result<ReportArtifact, ApiError>) -> Self {
        Self {
            delay,
            result,
            honor_cancel: true,
        }
    }

    pub const fn ignoring_cancel(mut self) -> Self {
        self.honor_cancel = false;
        self
    }
}

pub struct FakeBackend {
    analyze: Mutex<VecDeque<Scripted>>,
    reports: Mutex<VecDeque<Scripted>>,
    entitlement: Mutex<Result<Entitlement, ApiError>>,
    pub analyze_calls: AtomicU32,
    pub report_calls: AtomicU32,
    pub entitlement_calls: AtomicU32,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            analyze: Mutex::new(VecDeque::new()),
            reports: Mutex::new(VecDeque::new()),
            entitlement: Mutex::new(Ok(Entitlement::default())),
            analyze_calls: AtomicU32::new(0),
            report_calls: AtomicU32::new(0),
            entitlement_calls: AtomicU32::new(0),
        })
    }

    pub fn script_analyze(&self, step: Scripted) {
        self.analyze.lock().push_back(step);
    }

    /// Report reads past the script answer 404.
    pub fn script_report(&self, step: Scripted) {
        self.reports.lock().push_back(step);
    }

    pub fn set_entitlement(&self, result: Result<Entitlement, ApiError>) {
        *self.entitlement.lock() = result;
    }

    pub fn analyze_calls(&self) -> u32 {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn report_calls(&self) -> u32 {
        self.report_calls.load(Ordering::SeqCst)
    }

    async fn play(step: Option<Scripted>, cancel: &CancellationToken) -> Result<ReportArtifact, ApiError> {
        let step = step.unwrap_or_else(|| Scripted::err(not_found()));
        if !step.honor_cancel {
            tokio::time::sleep(step.delay).await;
            return step.result;
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ApiError::Canceled),
            () = tokio::time::sleep(step.delay) => step.result,
        }
    }
}

#[async_trait]
impl ReportBackend for FakeBackend {
    async fn analyze(
        &self,
        _date: &str,
        _force: bool,
        cancel: &CancellationToken,
    ) -> Result<ReportArtifact, ApiError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.analyze.lock().pop_front();
        Self::play(step, cancel).await
    }

    async fn report(
        &self,
        _date: &str,
        cancel: &CancellationToken,
    ) -> Result<ReportArtifact, ApiError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.reports.lock().pop_front();
        Self::play(step, cancel).await
    }

    async fn entitlements(&self) -> Result<Entitlement, ApiError> {
        self.entitlement_calls.fetch_add(1, Ordering::SeqCst);
        self.entitlement.lock().clone()
    }

    async fn activation(&self) -> Result<Activation, ApiError> {
        Ok(Activation::default())
    }
}

pub fn artifact(date: &str) -> ReportArtifact {
    ReportArtifact {
        date: date.to_string(),
        report: Report {
            summary: format!("report for {date}"),
            ..Report::default()
        },
    }
}

pub fn not_found() -> ApiError {
    status(404, "Not found", None, None)
}

pub fn in_progress() -> ApiError {
    status(
        409,
        "Report generation already running",
        Some(ANALYZE_IN_PROGRESS),
        None,
    )
}

pub fn status(code: u16, message: &str, error_code: Option<&str>, reference_id: Option<&str>) -> ApiError {
    ApiError::Status {
        status: code,
        body: ErrorBody {
            message: message.to_string(),
            code: error_code.map(str::to_string),
            reference_id: reference_id.map(str::to_string),
            ..ErrorBody::default()
        },
    }
}

pub fn orchestrator(backend: &Arc<FakeBackend>) -> Orchestrator {
    orchestrator_with_clock(backend, &FakeClock::new())
}

/// Orchestrator whose wall clock the test drives.
pub fn orchestrator_with_clock(backend: &Arc<FakeBackend>, clock: &FakeClock) -> Orchestrator {
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let backend: Arc<dyn ReportBackend> = Arc::clone(backend) as Arc<dyn ReportBackend>;
    let gate = EntitlementGate::new(
        Arc::clone(&backend),
        Duration::from_secs(60),
        Arc::clone(&clock),
    );
    let cache = response_cache(&CacheConfig::default(), Arc::clone(&clock));
    Orchestrator::new(
        backend,
        Arc::new(gate),
        Arc::new(cache),
        RetryPolicy::new(6, Duration::from_secs(5)),
        clock,
        "en",
    )
}
