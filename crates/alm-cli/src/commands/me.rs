use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `alm entitlements`.
pub async fn entitlements(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let entitlement = ctx.orchestrator.gate().entitlement().await?;
    output(&entitlement, flags.format)
}

/// Handle `alm activation`.
pub async fn activation(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let activation = ctx.orchestrator.gate().activation().await?;
    output(&activation, flags.format)
}
