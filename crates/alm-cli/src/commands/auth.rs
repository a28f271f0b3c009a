use alm_auth::token_store;
use alm_config::AlmanacConfig;
use alm_gateway::Gateway;
use anyhow::Context;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::AuthCommands;
use crate::output::output;

#[derive(Debug, Serialize)]
struct AuthStatus {
    authenticated: bool,
    active_source: Option<String>,
    stored_in: Option<&'static str>,
    configured_sources: Vec<String>,
    origin: String,
}

#[derive(Debug, Serialize)]
struct AuthAction {
    action: &'static str,
    ok: bool,
}

/// Handle `alm auth` subcommands.
pub async fn handle(
    action: &AuthCommands,
    flags: &GlobalFlags,
    config: &AlmanacConfig,
) -> anyhow::Result<()> {
    match action {
        AuthCommands::Status => status(flags, config).await,
        AuthCommands::SetToken(args) => {
            alm_auth::login_with_token(&args.token).context("failed to store token")?;
            output(
                &AuthAction {
                    action: "set-token",
                    ok: true,
                },
                flags.format,
            )
        }
        AuthCommands::Logout => {
            alm_auth::logout().context("failed to clear credentials")?;
            output(
                &AuthAction {
                    action: "logout",
                    ok: true,
                },
                flags.format,
            )
        }
    }
}

async fn status(flags: &GlobalFlags, config: &AlmanacConfig) -> anyhow::Result<()> {
    let gateway = Gateway::from_config(config)?;
    let credentials = gateway.credentials();
    let resolved = match credentials.resolve().await {
        Ok(resolved) => Some(resolved),
        Err(error) => {
            tracing::debug!(%error, "no credential resolved");
            None
        }
    };

    let status = AuthStatus {
        authenticated: resolved.is_some(),
        active_source: resolved.map(|resolved| resolved.source.to_string()),
        stored_in: token_store::detect_token_source(),
        configured_sources: credentials
            .sources()
            .iter()
            .map(ToString::to_string)
            .collect(),
        origin: gateway.origin().to_string(),
    };
    output(&status, flags.format)
}
