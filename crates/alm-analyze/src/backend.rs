//! The endpoints the orchestrator depends on, behind a trait so tests can
//! script responses.

use alm_core::{Activation, Entitlement, ReportArtifact};
use alm_gateway::{ApiClient, ApiError};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// `POST /api/analyze`.
    async fn analyze(
        &self,
        date: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<ReportArtifact, ApiError>;

    /// `GET /api/reports?date=`.
    async fn report(
        &self,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<ReportArtifact, ApiError>;

    async fn entitlements(&self) -> Result<Entitlement, ApiError>;

    async fn activation(&self) -> Result<Activation, ApiError>;
}

#[async_trait]
impl ReportBackend for ApiClient {
    async fn analyze(
        &self,
        date: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<ReportArtifact, ApiError> {
        Self::analyze(self, date, force, cancel).await
    }

    async fn report(
        &self,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<ReportArtifact, ApiError> {
        Self::report(self, date, cancel).await
    }

    async fn entitlements(&self) -> Result<Entitlement, ApiError> {
        Self::entitlements(self).await
    }

    async fn activation(&self) -> Result<Activation, ApiError> {
        Self::activation(self).await
    }
}
