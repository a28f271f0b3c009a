use std::sync::Arc;

use alm_config::AlmanacConfig;
use alm_core::SystemClock;
use anyhow::Context;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ExposureCommands;
use crate::output::output;

/// Handle `alm exposure` subcommands.
pub fn handle(
    action: &ExposureCommands,
    flags: &GlobalFlags,
    config: &AlmanacConfig,
) -> anyhow::Result<()> {
    let governor = alm_exposure::from_config(&config.exposure, Arc::new(SystemClock))
        .context("failed to open exposure store")?;

    match action {
        ExposureCommands::Check { slot } => output(&governor.evaluate(slot)?, flags.format),
        ExposureCommands::Record { slot } => {
            let decision = governor.evaluate(slot)?;
            if !decision.allowed {
                tracing::warn!(slot, blocked_by = ?decision.blocked_by, "recording past cap");
            }
            output(&governor.record_exposure(slot)?, flags.format)
        }
        ExposureCommands::Show => output(&governor.snapshot()?, flags.format),
    }
}
