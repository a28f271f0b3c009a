use alm_analyze::{AnalyzeError, JobSnapshot, Orchestrator, StartOutcome};
use alm_core::{JobStatus, Report};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::AnalyzeArgs;
use crate::context::AppContext;
use crate::output::{notice, output};

#[derive(Debug, Default, Serialize)]
pub struct AnalyzeResponse {
    pub date: String,
    pub status: String,
    pub advisory: Option<String>,
    pub report: Option<Report>,
    pub error: Option<String>,
    pub reference_id: Option<String>,
    pub retryable: Option<bool>,
    pub hint: Option<String>,
}

/// Handle `alm analyze`.
pub async fn handle(args: &AnalyzeArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let date = args.date.unwrap_or_else(|| ctx.today()).to_string();
    let orchestrator = ctx.orchestrator.clone();
    let interrupt = spawn_interrupt_watcher(orchestrator.clone(), date.clone());

    let started = orchestrator.start(&date, args.force).await;
    let response = match started {
        Ok(outcome) => respond(&orchestrator, &date, outcome, args.no_wait, flags).await,
        Err(AnalyzeError::AdmissionDenied(denied)) => {
            interrupt.abort();
            anyhow::bail!("{denied}; {}", denied.prompt());
        }
        Err(error) => {
            interrupt.abort();
            return Err(error.into());
        }
    };
    interrupt.abort();

    output(&response, flags.format)?;
    if orchestrator.is_shut_down() {
        anyhow::bail!("interrupted");
    }
    Ok(())
}

async fn respond(
    orchestrator: &Orchestrator,
    date: &str,
    outcome: StartOutcome,
    no_wait: bool,
    flags: &GlobalFlags,
) -> AnalyzeResponse {
    match outcome {
        StartOutcome::Recovering { advisory } => {
            if let Some(advisory) = &advisory {
                notice(advisory, flags.quiet);
            }
            if no_wait {
                return AnalyzeResponse {
                    date: date.to_string(),
                    status: JobStatus::RecoveryPolling.to_string(),
                    advisory,
                    hint: Some(format!("run `alm report {date}` later")),
                    ..AnalyzeResponse::default()
                };
            }
            let settled = orchestrator.wait_settled(date).await;
            from_settled(orchestrator, date, settled, advisory)
        }
        other => from_outcome(date, other),
    }
}

fn from_outcome(date: &str, outcome: StartOutcome) -> AnalyzeResponse {
    let base = AnalyzeResponse {
        date: date.to_string(),
        ..AnalyzeResponse::default()
    };
    match outcome {
        StartOutcome::Succeeded(artifact) => AnalyzeResponse {
            status: JobStatus::Succeeded.to_string(),
            report: Some(artifact.report),
            ..base
        },
        StartOutcome::Canceled => AnalyzeResponse {
            status: JobStatus::Canceled.to_string(),
            ..base
        },
        StartOutcome::Recovering { advisory } => AnalyzeResponse {
            status: JobStatus::RecoveryPolling.to_string(),
            advisory,
            ..base
        },
        StartOutcome::NotReady => AnalyzeResponse {
            status: JobStatus::Idle.to_string(),
            hint: Some("report not generated yet".to_string()),
            ..base
        },
        StartOutcome::Failed {
            message,
            reference_id,
            retryable,
        } => AnalyzeResponse {
            status: JobStatus::Failed.to_string(),
            error: Some(message),
            reference_id,
            retryable: Some(retryable),
            ..base
        },
    }
}

fn from_settled(
    orchestrator: &Orchestrator,
    date: &str,
    settled: Option<JobSnapshot>,
    advisory: Option<String>,
) -> AnalyzeResponse {
    let Some(job) = settled else {
        return AnalyzeResponse {
            date: date.to_string(),
            status: JobStatus::Idle.to_string(),
            advisory,
            ..AnalyzeResponse::default()
        };
    };

    let hint = match job.status {
        JobStatus::GaveUp => Some(format!("run `alm report {date} --refresh`")),
        JobStatus::RecoveryPolling => Some(format!("run `alm report {date}` later")),
        _ => None,
    };
    let report = if job.status == JobStatus::Succeeded {
        orchestrator.cached(date).map(|artifact| artifact.report)
    } else {
        None
    };

    AnalyzeResponse {
        date: date.to_string(),
        status: job.status.to_string(),
        advisory: job.advisory.or(advisory),
        report,
        error: job.last_error,
        reference_id: job.reference_id,
        retryable: None,
        hint,
    }
}

/// Ctrl-C cancels a starting job; once recovering, it stops the poller.
fn spawn_interrupt_watcher(
    orchestrator: Orchestrator,
    date: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        if !orchestrator.cancel(&date) {
            tracing::debug!(%date, "interrupt while recovering; tearing down");
            orchestrator.teardown().await;
        }
    })
}
