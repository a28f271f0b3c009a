//! # alm-gateway
//!
//! Request gateway for the Almanac REST API.
//!
//! - Resolves the target origin (never a loopback origin for a non-local client)
//! - Attaches a bearer credential from [`alm_auth::CredentialChain`]
//! - Bounds every call by a timeout and an optional cancellation token
//! - Normalizes flat and nested error bodies into [`ApiError`], keeping the
//!   original HTTP status
//! - Coerces successful bodies into fully-typed values with per-field fallbacks

pub mod api;
pub mod body;
pub mod client;
pub mod error;
pub mod origin;
pub mod validated;

pub use api::ApiClient;
pub use client::{Gateway, RequestOptions};
pub use error::{ANALYZE_IN_PROGRESS, ApiError, ErrorBody, ErrorKind};
pub use origin::resolve_origin;
