use alm_analyze::StartOutcome;
use alm_cache::{CacheKey, SwrLoader};
use alm_core::ReportArtifact;
use alm_gateway::{ApiError, ErrorKind};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ReportArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `alm report`.
pub async fn handle(args: &ReportArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let date = args.date.unwrap_or_else(|| ctx.today()).to_string();

    let artifact = if args.refresh {
        refresh(ctx, &date).await?
    } else {
        let loader = SwrLoader::new(ctx.orchestrator.response_cache());
        let api = ctx.api.clone();
        let day = date.clone();
        let fetch = async move {
            api.report(&day, &CancellationToken::new())
                .await
                .map_err(|error| describe(&day, &error))
        };
        read_through(&loader, ctx.orchestrator.cache_key(&date), fetch).await?
    };

    output(&artifact, flags.format)
}

/// Load through the response cache and return the settled view. A cached
/// report is returned after its background revalidation finishes.
async fn read_through<F>(
    loader: &SwrLoader<CacheKey, ReportArtifact>,
    key: CacheKey,
    fetch: F,
) -> anyhow::Result<ReportArtifact>
where
    F: Future<Output = Result<ReportArtifact, String>> + Send + 'static,
{
    if let Some(revalidation) = loader.load(key, fetch).await
        && let Err(error) = revalidation.await
    {
        tracing::warn!(%error, "report revalidation task failed");
    }

    let view = loader.view();
    match (view.data, view.error) {
        (Some(artifact), _) => Ok(artifact),
        (None, Some(error)) => anyhow::bail!(error),
        (None, None) => anyhow::bail!("no report loaded"),
    }
}

fn describe(date: &str, error: &ApiError) -> String {
    if error.kind() == ErrorKind::NotFound {
        format!("report for {date} has not been generated yet")
    } else {
        error.to_string()
    }
}

async fn refresh(ctx: &AppContext, date: &str) -> anyhow::Result<ReportArtifact> {
    match ctx.orchestrator.refresh(date).await? {
        StartOutcome::Succeeded(artifact) => Ok(artifact),
        StartOutcome::NotReady => anyhow::bail!("report for {date} has not been generated yet"),
        StartOutcome::Canceled => anyhow::bail!("refresh canceled"),
        StartOutcome::Failed {
            message,
            reference_id: Some(reference),
            ..
        } => anyhow::bail!("{message} (reference: {reference})"),
        StartOutcome::Failed { message, .. } => anyhow::bail!("{message}"),
        StartOutcome::Recovering { .. } => anyhow::bail!("report for {date} is still being generated"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use alm_cache::TtlCache;
    use alm_core::{FakeClock, Report};
    use pretty_assertions::assert_eq;

    use super::*;

    fn artifact(summary: &str) -> ReportArtifact {
        ReportArtifact {
            date: "2026-03-02".into(),
            report: Report {
                summary: summary.into(),
                ..Report::default()
            },
        }
    }

    fn loader() -> (Arc<TtlCache<CacheKey, ReportArtifact>>, SwrLoader<CacheKey, ReportArtifact>) {
        let cache = Arc::new(TtlCache::new(
            Duration::from_secs(300),
            Arc::new(FakeClock::new()),
        ));
        (Arc::clone(&cache), SwrLoader::new(cache))
    }

    #[tokio::test]
    async fn miss_reads_from_api_and_fills_cache() {
        let (cache, loader) = loader();
        let key = CacheKey::new("2026-03-02", "en");

        let read = read_through(&loader, key.clone(), async { Ok(artifact("fresh")) })
            .await
            .unwrap();
        assert_eq!(read, artifact("fresh"));
        assert_eq!(cache.get(&key), Some(artifact("fresh")));
    }

    #[tokio::test]
    async fn cached_report_survives_failed_revalidation() {
        let (cache, loader) = loader();
        let key = CacheKey::new("2026-03-02", "en");
        cache.set(key.clone(), artifact("cached"));

        let read = read_through(&loader, key, async { Err("upstream down".to_string()) })
            .await
            .unwrap();
        assert_eq!(read, artifact("cached"));
    }

    #[tokio::test]
    async fn cached_report_is_replaced_by_revalidation() {
        let (cache, loader) = loader();
        let key = CacheKey::new("2026-03-02", "en");
        cache.set(key.clone(), artifact("cached"));

        let read = read_through(&loader, key.clone(), async { Ok(artifact("fresh")) })
            .await
            .unwrap();
        assert_eq!(read, artifact("fresh"));
        assert_eq!(cache.get(&key), Some(artifact("fresh")));
    }

    #[tokio::test]
    async fn missing_report_surfaces_not_generated() {
        let (_, loader) = loader();
        let error = read_through(&loader, CacheKey::new("2026-03-02", "en"), async {
            Err(describe(
                "2026-03-02",
                &ApiError::Status {
                    status: 404,
                    body: alm_gateway::ErrorBody::default(),
                },
            ))
        })
        .await
        .unwrap_err();
        assert_eq!(error.to_string(), "report for 2026-03-02 has not been generated yet");
    }
}
