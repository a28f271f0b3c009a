use alm_config::AlmanacConfig;

use crate::cli::GlobalFlags;
use crate::output::output;

const REDACTED: &str = "***";

/// Handle `alm config`: print the effective configuration with secrets masked.
pub fn handle(flags: &GlobalFlags, config: &AlmanacConfig) -> anyhow::Result<()> {
    output(&redacted(config), flags.format)
}

fn redacted(config: &AlmanacConfig) -> AlmanacConfig {
    let mut config = config.clone();
    for secret in [
        &mut config.auth.refresh_token,
        &mut config.auth.session_cookie,
        &mut config.auth.test_bridge_token,
    ] {
        if !secret.is_empty() {
            *secret = REDACTED.to_string();
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn secrets_are_masked_and_empty_stay_empty() {
        let mut config = AlmanacConfig::default();
        config.auth.refresh_token = "rt_live".into();
        config.auth.session_cookie = "sid=abc".into();

        let shown = redacted(&config);
        assert_eq!(shown.auth.refresh_token, REDACTED);
        assert_eq!(shown.auth.session_cookie, REDACTED);
        assert_eq!(shown.auth.test_bridge_token, "");
        assert_eq!(shown.auth.cookie_exchange_path, config.auth.cookie_exchange_path);
    }
}
