//! # alm-config
//!
//! Layered configuration loading for Almanac using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`ALMANAC_*` prefix, `__` as separator)
//! 2. Project-level `.almanac/config.toml`
//! 3. User-level `~/.config/almanac/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `ALMANAC_API__BASE_URL` -> `api.base_url`,
//! `ALMANAC_EXPOSURE__DAILY_CAP` -> `exposure.daily_cap`, etc.
//! The `__` (double underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use alm_config::AlmanacConfig;
//!
//! let config = AlmanacConfig::load_with_dotenv().expect("config");
//! println!("analyze timeout: {:?}", config.api.analyze_timeout());
//! ```

mod api;
mod auth;
mod cache;
mod error;
mod exposure;
mod general;
mod recovery;

pub use api::{ApiConfig, DEFAULT_PRODUCTION_URL};
pub use auth::AuthConfig;
pub use cache::{CacheConfig, REPORT_TTL_BOUNDS};
pub use error::ConfigError;
pub use exposure::ExposureConfig;
pub use general::GeneralConfig;
pub use recovery::RecoveryConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlmanacConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub exposure: ExposureConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl AlmanacConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] if you need `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if extraction fails or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".almanac/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("ALMANAC_").split("__"))
    }

    /// Reject values that would disable a core invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| {
            Err(ConfigError::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.recovery.max_attempts == 0 {
            return invalid("recovery.max_attempts", "must be at least 1");
        }
        if self.api.timeout_secs == 0 || self.api.analyze_timeout_secs == 0 {
            return invalid("api.timeout_secs", "timeouts must be non-zero");
        }
        if self.exposure.per_slot_daily_cap > self.exposure.daily_cap {
            return invalid(
                "exposure.per_slot_daily_cap",
                "cannot exceed exposure.daily_cap",
            );
        }
        if self.exposure.daily_cap > self.exposure.weekly_cap {
            return invalid("exposure.daily_cap", "cannot exceed exposure.weekly_cap");
        }
        if self.general.locale.trim().is_empty() {
            return invalid("general.locale", "must not be empty");
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("almanac").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AlmanacConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recovery.max_attempts, 6);
        assert_eq!(config.exposure.daily_cap, 3);
    }

    #[test]
    fn figment_builds_without_files() {
        let figment = AlmanacConfig::figment();
        let config: AlmanacConfig = figment.extract().expect("should extract defaults");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.general.locale, "en");
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AlmanacConfig::default();
        config.recovery.max_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("recovery.max_attempts"));
    }

    #[test]
    fn slot_cap_above_daily_cap_rejected() {
        let mut config = AlmanacConfig::default();
        config.exposure.per_slot_daily_cap = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "exposure.per_slot_daily_cap"
        ));
    }
}
