//! # alm-auth
//!
//! Bearer credential resolution for the Almanac API client.
//!
//! Tokens are resolved by trying, in order:
//! 1. the active session token (keyring → env → file),
//! 2. a refresh-token exchange,
//! 3. a server-bridged cookie exchange,
//! 4. a test-mode bridge token.
//!
//! If every source comes up empty the caller gets [`AuthError::NotAuthenticated`].

pub mod chain;
pub mod error;
pub mod expiry;
pub mod providers;
pub mod token_store;

pub use chain::{CredentialChain, ResolvedToken};
pub use error::AuthError;
pub use providers::{TokenProvider, TokenSource};

/// Persist a session token for later runs.
///
/// # Errors
///
/// Returns `AuthError::TokenStoreError` if neither keyring nor file storage works.
pub fn login_with_token(token: &str) -> Result<(), AuthError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Other("token must not be empty".into()));
    }
    if expiry::is_near_expiry(token, chrono::Utc::now()) {
        return Err(AuthError::TokenExpired);
    }
    token_store::store(token)
}

/// Clear stored credentials.
///
/// # Errors
///
/// Returns `AuthError::TokenStoreError` if the credentials file cannot be removed.
pub fn logout() -> Result<(), AuthError> {
    token_store::delete()
}
