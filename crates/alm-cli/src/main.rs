use clap::Parser;

mod bootstrap;
mod cli;
mod commands;
mod context;
mod output;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("alm error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    bootstrap::init_tracing(cli.quiet, cli.verbose)?;

    let flags = cli.global_flags();
    let config = bootstrap::load_config()?;

    match &cli.command {
        cli::Commands::Auth { action } => return commands::auth::handle(action, &flags, &config).await,
        cli::Commands::Exposure { action } => return commands::exposure::handle(action, &flags, &config),
        cli::Commands::Config => return commands::config::handle(&flags, &config),
        _ => {}
    }

    let ctx = context::AppContext::init(&config)?;
    commands::dispatch::dispatch(cli.command, &ctx, &flags).await
}
