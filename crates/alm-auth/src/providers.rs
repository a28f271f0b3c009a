//! Individual bearer token sources.
//!
//! Each provider answers `Ok(None)` when it has nothing to offer and `Err`
//! when it tried and failed; [`crate::CredentialChain`] treats both as
//! "move on to the next source".

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::AuthError;

/// Where a resolved bearer token came from, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSource {
    Session,
    Refresh,
    CookieExchange,
    TestBridge,
}

impl TokenSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Refresh => "refresh",
            Self::CookieExchange => "cookie_exchange",
            Self::TestBridge => "test_bridge",
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    fn source(&self) -> TokenSource;

    async fn token(&self) -> Result<Option<String>, AuthError>;
}

// ── Session ────────────────────────────────────────────────────────

/// Active session token from the local token store. Stale JWTs are skipped
/// by the store, so the chain falls through to the refresh exchange.
#[derive(Debug, Default)]
pub struct SessionProvider;

#[async_trait]
impl TokenProvider for SessionProvider {
    fn source(&self) -> TokenSource {
        TokenSource::Session
    }

    async fn token(&self) -> Result<Option<String>, AuthError> {
        Ok(crate::token_store::load())
    }
}

// ── Refresh ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Option<String> {
        self.access_token
            .or(self.token)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Exchanges a long-lived refresh token for an access token.
///
/// The access token is reused until it comes within the expiry buffer;
/// opaque (non-JWT) tokens are reused for the provider's lifetime. The lock
/// is held across the exchange so concurrent callers wait for one POST.
pub struct RefreshProvider {
    http: reqwest::Client,
    refresh_url: String,
    refresh_token: String,
    access: Mutex<Option<String>>,
}

impl RefreshProvider {
    #[must_use]
    pub fn new(http: reqwest::Client, refresh_url: &str, refresh_token: &str) -> Self {
        Self {
            http,
            refresh_url: refresh_url.to_string(),
            refresh_token: refresh_token.to_string(),
            access: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> Result<Option<String>, AuthError> {
        let fail = |message: String| AuthError::ExchangeFailed {
            source_name: TokenSource::Refresh.as_str(),
            message,
        };

        let resp = self
            .http
            .post(&self.refresh_url)
            .json(&serde_json::json!({ "refresh_token": self.refresh_token }))
            .send()
            .await
            .map_err(|e| fail(format!("send: {e}")))?
            .error_for_status()
            .map_err(|e| fail(format!("status: {e}")))?;

        let body: TokenResponse = resp.json().await.map_err(|e| fail(format!("parse: {e}")))?;
        Ok(body.into_token())
    }
}

#[async_trait]
impl TokenProvider for RefreshProvider {
    fn source(&self) -> TokenSource {
        TokenSource::Refresh
    }

    async fn token(&self) -> Result<Option<String>, AuthError> {
        let mut access = self.access.lock().await;
        if let Some(token) = access.as_ref()
            && !crate::expiry::is_near_expiry(token, chrono::Utc::now())
        {
            return Ok(Some(token.clone()));
        }

        let fresh = self.exchange().await?;
        tracing::debug!(obtained = fresh.is_some(), "refresh exchange completed");
        access.clone_from(&fresh);
        Ok(fresh)
    }
}

// ── Cookie exchange ────────────────────────────────────────────────

/// Trades a server session cookie for a bearer token via the API's bridge endpoint.
pub struct CookieExchangeProvider {
    http: reqwest::Client,
    exchange_url: String,
    cookie: String,
}

impl CookieExchangeProvider {
    #[must_use]
    pub fn new(http: reqwest::Client, exchange_url: String, cookie: &str) -> Self {
        Self {
            http,
            exchange_url,
            cookie: cookie.to_string(),
        }
    }
}

#[async_trait]
impl TokenProvider for CookieExchangeProvider {
    fn source(&self) -> TokenSource {
        TokenSource::CookieExchange
    }

    async fn token(&self) -> Result<Option<String>, AuthError> {
        let fail = |message: String| AuthError::ExchangeFailed {
            source_name: TokenSource::CookieExchange.as_str(),
            message,
        };

        let resp = self
            .http
            .get(&self.exchange_url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .send()
            .await
            .map_err(|e| fail(format!("send: {e}")))?;

        // 401 means "no session behind this cookie", which is not a failure.
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let resp = resp
            .error_for_status()
            .map_err(|e| fail(format!("status: {e}")))?;

        let body: TokenResponse = resp.json().await.map_err(|e| fail(format!("parse: {e}")))?;
        Ok(body.into_token())
    }
}

// ── Static ─────────────────────────────────────────────────────────

/// A fixed token, e.g. the test-mode bridge token.
pub struct StaticProvider {
    source: TokenSource,
    token: String,
}

impl StaticProvider {
    #[must_use]
    pub fn new(source: TokenSource, token: &str) -> Self {
        Self {
            source,
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticProvider {
    fn source(&self) -> TokenSource {
        self.source
    }

    async fn token(&self) -> Result<Option<String>, AuthError> {
        Ok(Some(self.token.clone()).filter(|t| !t.is_empty()))
    }
}
