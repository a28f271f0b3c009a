//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_locale() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Locale that scopes cached report artifacts.
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
        }
    }
}
