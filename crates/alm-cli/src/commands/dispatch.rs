use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Analyze(args) => commands::analyze::handle(&args, ctx, flags).await,
        Commands::Report(args) => commands::report::handle(&args, ctx, flags).await,
        Commands::Entitlements => commands::me::entitlements(ctx, flags).await,
        Commands::Activation => commands::me::activation(ctx, flags).await,
        Commands::Auth { .. } | Commands::Exposure { .. } | Commands::Config => {
            anyhow::bail!("auth/exposure/config are handled before the API context is built")
        }
    }
}
