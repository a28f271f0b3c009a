//! Bearer credential sources.

use serde::{Deserialize, Serialize};

fn default_cookie_exchange_path() -> String {
    "/api/auth/session-token".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Long-lived refresh token used when no session token is available.
    #[serde(default)]
    pub refresh_token: String,

    /// Token endpoint for the refresh exchange (absolute URL).
    #[serde(default)]
    pub refresh_url: String,

    /// Session cookie forwarded to the server-bridged exchange endpoint.
    #[serde(default)]
    pub session_cookie: String,

    /// Path on the API origin that trades a session cookie for a bearer token.
    #[serde(default = "default_cookie_exchange_path")]
    pub cookie_exchange_path: String,

    /// Enables the test-mode bridge token. Never set in production.
    #[serde(default)]
    pub test_mode: bool,

    #[serde(default)]
    pub test_bridge_token: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_token: String::new(),
            refresh_url: String::new(),
            session_cookie: String::new(),
            cookie_exchange_path: default_cookie_exchange_path(),
            test_mode: false,
            test_bridge_token: String::new(),
        }
    }
}

impl AuthConfig {
    /// Check whether the refresh exchange can be attempted.
    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty() && !self.refresh_url.is_empty()
    }

    /// Check whether the cookie exchange can be attempted.
    pub fn can_exchange_cookie(&self) -> bool {
        !self.session_cookie.is_empty()
    }

    /// The test bridge token, only when test mode is on.
    pub fn test_bridge(&self) -> Option<&str> {
        (self.test_mode && !self.test_bridge_token.is_empty())
            .then_some(self.test_bridge_token.as_str())
    }
}
