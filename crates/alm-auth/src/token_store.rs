//! Local session token storage.
//!
//! Tiers are read in order: OS keyring, `ALMANAC_AUTH__SESSION_TOKEN`, then
//! `~/.almanac/credentials`. Writes go to the keyring, or to the credentials
//! file when no keyring is usable. A JWT within the expiry buffer is stale:
//! loading skips it and moves on to the next tier.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::expiry;

const KEYRING_USER: &str = "session-token";

/// Environment variable carrying a session token.
pub const SESSION_TOKEN_ENV: &str = "ALMANAC_AUTH__SESSION_TOKEN";

/// Overrides the keyring service name so tests never touch real credentials.
pub const KEYRING_SERVICE_ENV: &str = "ALMANAC_KEYRING_SERVICE";

/// Where a stored session token lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTier {
    Keyring,
    Env,
    File,
}

impl StoreTier {
    const READ_ORDER: [Self; 3] = [Self::Keyring, Self::Env, Self::File];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyring => "keyring",
            Self::Env => "env",
            Self::File => "file",
        }
    }

    fn read(self) -> Option<String> {
        let raw = match self {
            Self::Keyring => keyring_entry().ok()?.get_password().ok(),
            Self::Env => std::env::var(SESSION_TOKEN_ENV).ok(),
            Self::File => read_credentials(&credentials_path().ok()?),
        };
        non_blank(raw?)
    }
}

/// A usable session token and the tier it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub tier: StoreTier,
}

/// Persist a session token, preferring the keyring.
///
/// # Errors
///
/// Returns `AuthError::TokenStoreError` if neither the keyring nor the
/// credentials file can be written.
pub fn store(token: &str) -> Result<(), AuthError> {
    let keyring = keyring_entry().and_then(|entry| {
        entry
            .set_password(token)
            .map_err(|e| AuthError::KeyringError(e.to_string()))
    });
    match keyring {
        Ok(()) => {
            tracing::debug!(tier = StoreTier::Keyring.as_str(), "session token stored");
            Ok(())
        }
        Err(error) => {
            tracing::warn!(%error, "keyring unusable; writing credentials file");
            write_credentials(&credentials_path()?, token)
        }
    }
}

/// The first non-stale session token across all tiers.
#[must_use]
pub fn load() -> Option<String> {
    session_at(Utc::now()).map(|session| session.token)
}

/// The session `load` would return at `now`, with its tier.
#[must_use]
pub fn session_at(now: DateTime<Utc>) -> Option<StoredSession> {
    first_usable(
        StoreTier::READ_ORDER.into_iter().map(|tier| (tier, tier.read())),
        now,
    )
}

/// Name of the tier the active session token comes from, for status output.
#[must_use]
pub fn detect_token_source() -> Option<&'static str> {
    session_at(Utc::now()).map(|session| session.tier.as_str())
}

/// Remove the keyring entry and the credentials file. The env tier is left alone.
///
/// # Errors
///
/// Returns `AuthError::TokenStoreError` if the credentials file cannot be removed.
pub fn delete() -> Result<(), AuthError> {
    if let Ok(entry) = keyring_entry()
        && let Err(error) = entry.delete_credential()
    {
        tracing::debug!(%error, "no keyring entry to delete");
    }

    let path = credentials_path()?;
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AuthError::TokenStoreError(format!(
            "remove {}: {e}",
            path.display()
        ))),
    }
}

fn first_usable(
    candidates: impl IntoIterator<Item = (StoreTier, Option<String>)>,
    now: DateTime<Utc>,
) -> Option<StoredSession> {
    candidates.into_iter().find_map(|(tier, token)| {
        let token = token?;
        if expiry::is_near_expiry(&token, now) {
            tracing::debug!(tier = tier.as_str(), "stored session token is stale; skipping");
            return None;
        }
        Some(StoredSession { token, tier })
    })
}

fn keyring_entry() -> Result<keyring::Entry, AuthError> {
    let service =
        std::env::var(KEYRING_SERVICE_ENV).unwrap_or_else(|_| "almanac-cli".to_string());
    keyring::Entry::new(&service, KEYRING_USER).map_err(|e| AuthError::KeyringError(e.to_string()))
}

fn credentials_path() -> Result<PathBuf, AuthError> {
    dirs::home_dir()
        .map(|home| home.join(".almanac").join("credentials"))
        .ok_or_else(|| AuthError::TokenStoreError("no home directory for credentials".into()))
}

fn write_credentials(path: &Path, token: &str) -> Result<(), AuthError> {
    let store_err = |action: &str, path: &Path, e: std::io::Error| {
        AuthError::TokenStoreError(format!("{action} {}: {e}", path.display()))
    };

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| store_err("mkdir", dir, e))?;
    }
    fs::write(path, token).map_err(|e| store_err("write", path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| store_err("chmod", path, e))?;
    }
    tracing::debug!(tier = StoreTier::File.as_str(), "session token stored");
    Ok(())
}

fn read_credentials(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().and_then(non_blank)
}

fn non_blank(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
