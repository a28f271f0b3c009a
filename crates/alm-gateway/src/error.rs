//! Gateway error types.

use std::time::Duration;

use thiserror::Error;

/// Server code signalling that an analyze job for the same key is already running.
pub const ANALYZE_IN_PROGRESS: &str = "ANALYZE_IN_PROGRESS";

/// Normalized non-2xx response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    pub hint: Option<String>,
    pub code: Option<String>,
    /// Opaque id for support correlation, when the server supplied one.
    pub reference_id: Option<String>,
}

/// Errors returned by the request gateway.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No credential source produced a bearer token.
    #[error("not authenticated")]
    Unauthenticated,

    /// The request did not complete within its timeout and was aborted.
    #[error("request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    /// The caller's cancellation token fired before a response arrived.
    #[error("request canceled")]
    Canceled,

    /// Connection-level failure (DNS, TLS, reset).
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("{} (HTTP {status})", .body.message)]
    Status { status: u16, body: ErrorBody },

    /// A 2xx body could not be decoded at all.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Coarse classification used by the analyze orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    Timeout,
    Canceled,
    NotFound,
    InProgress,
    Upstream,
    Transport,
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Canceled => ErrorKind::Canceled,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Upstream,
            Self::Status { status: 401, .. } => ErrorKind::Unauthenticated,
            Self::Status { status: 404, .. } => ErrorKind::NotFound,
            Self::Status { status: 409, body } if body.code.as_deref() == Some(ANALYZE_IN_PROGRESS) => {
                ErrorKind::InProgress
            }
            Self::Status { .. } => ErrorKind::Upstream,
        }
    }

    /// The original HTTP status, when a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn body(&self) -> Option<&ErrorBody> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    #[must_use]
    pub fn reference_id(&self) -> Option<&str> {
        self.body().and_then(|b| b.reference_id.as_deref())
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.body().and_then(|b| b.hint.as_deref())
    }

    /// User-facing message: the server's message when there is one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { body, .. } => body.message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether a retry could plausibly succeed without user action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Unauthenticated | Self::Canceled | Self::Decode(_) => false,
        }
    }
}
