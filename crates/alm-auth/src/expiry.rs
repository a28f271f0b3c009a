use base64::Engine as _;
use chrono::{DateTime, Utc};

use crate::error::AuthError;

/// Session tokens expiring within this window are treated as absent.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Decode JWT `exp` claim without signature validation.
///
/// The server is the authority on validity; this only lets the client skip a
/// token it already knows is stale and fall through to the next source.
///
/// # Errors
///
/// Returns `AuthError::Other` if the JWT format is invalid or the `exp` claim
/// is missing or cannot be parsed.
pub fn decode_expiry(jwt: &str) -> Result<DateTime<Utc>, AuthError> {
    let parts: Vec<&str> = jwt.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::Other("invalid JWT format".into()));
    }
    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| AuthError::Other(format!("base64 decode failed: {e}")))?;
    let value: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|e| AuthError::Other(format!("JSON parse failed: {e}")))?;
    let exp = value["exp"]
        .as_i64()
        .ok_or_else(|| AuthError::Other("missing exp claim".into()))?;
    DateTime::from_timestamp(exp, 0).ok_or_else(|| AuthError::Other("invalid exp timestamp".into()))
}

/// Whether `token` is a JWT that expires within [`EXPIRY_BUFFER_SECS`] of `now`.
///
/// Opaque (non-JWT) tokens are never considered expired.
#[must_use]
pub fn is_near_expiry(token: &str, now: DateTime<Utc>) -> bool {
    match decode_expiry(token) {
        Ok(expires_at) => expires_at - now < chrono::Duration::seconds(EXPIRY_BUFFER_SECS),
        Err(_) => false,
    }
}
