use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::cli::subcommands::{AuthCommands, ExposureCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Generate the report for a date, recovering in the background on timeout.
    Analyze(AnalyzeArgs),
    /// Fetch the stored report for a date.
    Report(ReportArgs),
    /// Show plan and quota.
    Entitlements,
    /// Show onboarding progress.
    Activation,
    /// Promotional exposure caps.
    Exposure {
        #[command(subcommand)]
        action: ExposureCommands,
    },
    /// Authentication.
    Auth {
        #[command(subcommand)]
        action: AuthCommands,
    },
    /// Show the effective configuration (secrets redacted).
    Config,
}

#[derive(Clone, Debug, Args)]
pub struct AnalyzeArgs {
    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(value_parser = parse_date)]
    pub date: Option<NaiveDate>,
    /// Regenerate even if a report already exists.
    #[arg(long)]
    pub force: bool,
    /// Return as soon as recovery starts instead of waiting for it.
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ReportArgs {
    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(value_parser = parse_date)]
    pub date: Option<NaiveDate>,
    /// Re-read after a give-up, tracked as a job (no new analyze run).
    #[arg(long)]
    pub refresh: bool,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("expected a date as YYYY-MM-DD, got '{value}'"))
}
