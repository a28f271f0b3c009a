use std::sync::Arc;

use alm_analyze::{Orchestrator, ReportBackend};
use alm_config::AlmanacConfig;
use alm_core::{Clock, SystemClock};
use alm_gateway::ApiClient;
use anyhow::Context;

/// Shared state for commands that talk to the API.
pub struct AppContext {
    pub api: ApiClient,
    pub orchestrator: Orchestrator,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    pub fn init(config: &AlmanacConfig) -> anyhow::Result<Self> {
        let api = ApiClient::from_config(config).context("failed to build API client")?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let backend: Arc<dyn ReportBackend> = Arc::new(api.clone());
        let orchestrator = Orchestrator::from_config(config, backend, Arc::clone(&clock));
        tracing::debug!(origin = api.gateway().origin(), "app context ready");

        Ok(Self {
            api,
            orchestrator,
            clock,
        })
    }

    /// Today's date in local time, as an entity key.
    pub fn today(&self) -> chrono::NaiveDate {
        self.clock.now().date_naive()
    }
}
