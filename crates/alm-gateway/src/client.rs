//! The request gateway: authenticated, timeout-bounded, cancellable HTTP calls.

use std::sync::Arc;
use std::time::Duration;

use alm_auth::CredentialChain;
use alm_config::AlmanacConfig;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::body::parse_error_body;
use crate::error::ApiError;
use crate::origin::resolve_origin;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the gateway default timeout.
    pub timeout: Option<Duration>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: &CancellationToken) -> Self {
        self.cancel = Some(token.clone());
        self
    }
}

/// HTTP gateway to the Almanac API.
#[derive(Debug, Clone)]
pub struct Gateway {
    http: reqwest::Client,
    origin: String,
    credentials: Arc<CredentialChain>,
    default_timeout: Duration,
}

impl Gateway {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        origin: &str,
        credentials: CredentialChain,
        default_timeout: Duration,
    ) -> Self {
        Self {
            http,
            origin: origin.trim_end_matches('/').to_string(),
            credentials: Arc::new(credentials),
            default_timeout,
        }
    }

    /// Build a gateway from configuration: origin safety rule, standard
    /// credential chain, default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &AlmanacConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("almanac/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Transport(format!("client build: {e}")))?;

        let origin = resolve_origin(
            &config.api.base_url,
            &config.api.client_origin,
            &config.api.production_url,
        );
        let credentials = CredentialChain::from_config(&config.auth, &origin, &http);
        tracing::debug!(%origin, sources = ?credentials.sources(), "gateway configured");

        Ok(Self::new(http, &origin, credentials, config.api.timeout()))
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialChain {
        &self.credentials
    }

    /// Issue a request and return the decoded JSON body (`Null` for an empty body).
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unauthenticated`] if no bearer token can be resolved
    /// - [`ApiError::Timeout`] if the call exceeds its timeout (it is aborted)
    /// - [`ApiError::Canceled`] if the options' cancellation token fires
    /// - [`ApiError::Status`] for non-2xx responses, with a normalized body
    /// - [`ApiError::Transport`] / [`ApiError::Decode`] otherwise
    pub async fn request_value(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let cancel = options.cancel.clone().unwrap_or_default();

        // Dropping the exchange future aborts the in-flight connection.
        let exchange = tokio::time::timeout(timeout, self.exchange(method.clone(), path, options));
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ApiError::Canceled),
            outcome = exchange => outcome.unwrap_or(Err(ApiError::Timeout { after: timeout })),
        };

        if let Err(error) = &result {
            tracing::debug!(%method, path, %error, status = ?error.status(), "request failed");
        }
        result
    }

    /// Issue a request and decode the body strictly into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::request_value`], plus [`ApiError::Decode`] on shape mismatch.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let value = self.request_value(method, path, options).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn exchange(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let resolved = self.credentials.resolve().await.map_err(|error| {
            tracing::warn!(%error, "no bearer credential available");
            ApiError::Unauthenticated
        })?;

        let url = format!("{}{path}", self.origin);
        let mut builder = self
            .http
            .request(method, &url)
            .bearer_auth(&resolved.token);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(map_transport)?;
        let status = resp.status();

        if !status.is_success() {
            let reference = resp
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: parse_error_body(status.as_u16(), &text, reference.as_deref()),
            });
        }

        let text = resp.text().await.map_err(map_transport)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn map_transport(error: reqwest::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}
