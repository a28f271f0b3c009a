//! REST API endpoint configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Known production origin used whenever the configured origin is unusable.
pub const DEFAULT_PRODUCTION_URL: &str = "https://api.almanac.app";

fn default_production_url() -> String {
    DEFAULT_PRODUCTION_URL.to_string()
}

/// Default per-request timeout in seconds.
const fn default_timeout_secs() -> u64 {
    15
}

/// Default timeout for the long-running analyze call, in seconds.
const fn default_analyze_timeout_secs() -> u64 {
    45
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Configured API origin. Empty means "use the production origin".
    #[serde(default)]
    pub base_url: String,

    /// Fallback origin for non-local clients.
    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// Origin of the calling client context (e.g. the web app host).
    /// Empty means the client itself is running locally.
    #[serde(default)]
    pub client_origin: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_analyze_timeout_secs")]
    pub analyze_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            production_url: default_production_url(),
            client_origin: String::new(),
            timeout_secs: default_timeout_secs(),
            analyze_timeout_secs: default_analyze_timeout_secs(),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.analyze_timeout_secs)
    }
}
