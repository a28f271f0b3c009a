//! Typed Almanac REST endpoints.
//!
//! | Call            | Endpoint                          |
//! |-----------------|-----------------------------------|
//! | `analyze`       | `POST /api/analyze {date, force}` |
//! | `report`        | `GET /api/reports?date=`          |
//! | `entitlements`  | `GET /api/me/entitlements`        |
//! | `activation`    | `GET /api/me/activation`          |

use std::time::Duration;

use alm_config::AlmanacConfig;
use alm_core::{Activation, Entitlement, ReportArtifact};
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::client::{Gateway, RequestOptions};
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct ApiClient {
    gateway: Gateway,
    analyze_timeout: Duration,
}

impl ApiClient {
    #[must_use]
    pub const fn new(gateway: Gateway, analyze_timeout: Duration) -> Self {
        Self {
            gateway,
            analyze_timeout,
        }
    }

    /// # Errors
    ///
    /// See [`Gateway::from_config`].
    pub fn from_config(config: &AlmanacConfig) -> Result<Self, ApiError> {
        Ok(Self::new(
            Gateway::from_config(config)?,
            config.api.analyze_timeout(),
        ))
    }

    #[must_use]
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Start report generation for `date`. Long-running; bounded by the
    /// analyze timeout rather than the default one.
    ///
    /// # Errors
    ///
    /// Gateway failures. A running job for the same date surfaces as HTTP 409
    /// with code `ANALYZE_IN_PROGRESS`.
    pub async fn analyze(
        &self,
        date: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<ReportArtifact, ApiError> {
        let options = RequestOptions::new()
            .timeout(self.analyze_timeout)
            .json(serde_json::json!({ "date": date, "force": force }))
            .cancel(cancel);
        self.gateway
            .fetch_validated(Method::POST, "/api/analyze", options, "analyze")
            .await
    }

    /// Read the current report for `date`. HTTP 404 means "not generated yet".
    ///
    /// # Errors
    ///
    /// Gateway failures.
    pub async fn report(
        &self,
        date: &str,
        cancel: &CancellationToken,
    ) -> Result<ReportArtifact, ApiError> {
        let options = RequestOptions::new().query("date", date).cancel(cancel);
        self.gateway
            .fetch_validated(Method::GET, "/api/reports", options, "report")
            .await
    }

    /// # Errors
    ///
    /// Gateway failures.
    pub async fn entitlements(&self) -> Result<Entitlement, ApiError> {
        self.gateway
            .fetch_validated(
                Method::GET,
                "/api/me/entitlements",
                RequestOptions::new(),
                "entitlements",
            )
            .await
    }

    /// # Errors
    ///
    /// Gateway failures.
    pub async fn activation(&self) -> Result<Activation, ApiError> {
        self.gateway
            .fetch_validated(
                Method::GET,
                "/api/me/activation",
                RequestOptions::new(),
                "activation",
            )
            .await
    }
}
