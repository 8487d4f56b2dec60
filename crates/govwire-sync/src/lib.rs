//! Ingestion orchestration: configuration, dedup, the per-run pipeline,
//! the trigger scheduler and retention maintenance.

use std::sync::Arc;

use anyhow::{Context, Result};
use govwire_adapters::{adapter_for_mode, SourceRegistry};
use govwire_core::RunResult;
use govwire_storage::{HttpClientConfig, SqliteRecordStore};
use tracing::info;

mod config;
mod dedup;
mod maintenance;
mod pipeline;
mod scheduler;

#[cfg(test)]
mod testing;

pub use config::{parse_trigger_list, parse_utc_offset, SyncConfig, DEFAULT_DATABASE_URL, DEFAULT_TIMEZONE};
pub use dedup::{fingerprint, normalize_title, Admission, Deduplicator};
pub use maintenance::{Maintenance, MAINTENANCE_PATTERN};
pub use pipeline::{IngestPipeline, PipelineError, PipelineSettings};
pub use scheduler::{
    next_trigger_time, parse_cron, RunAttempt, RunOutcome, Scheduler, SchedulerConfig, SchedulerError,
    SchedulerStatus, TriggerInfo, TriggerSpec,
};

pub const CRATE_NAME: &str = "govwire-sync";

/// Everything a process needs to ingest, schedule and serve.
pub struct Services {
    pub config: SyncConfig,
    pub store: Arc<SqliteRecordStore>,
    pub pipeline: Arc<IngestPipeline>,
    pub maintenance: Maintenance,
    pub scheduler: Scheduler,
}

/// Open the store, load the source registry and resolve the adapter mode.
/// The scheduler is built but not started.
pub async fn build_services(config: SyncConfig) -> Result<Services> {
    let store = Arc::new(
        SqliteRecordStore::connect(&config.database_url)
            .await
            .with_context(|| format!("opening record store {}", config.database_url))?,
    );
    let registry = SourceRegistry::load_or_builtin(&config.sources_path)?;
    let adapter = adapter_for_mode(
        config.adapter_mode,
        HttpClientConfig {
            fetch_budget: config.fetch_timeout,
            user_agent: Some(config.user_agent.clone()),
            ..Default::default()
        },
        config.timezone,
    )
    .context("building source adapter")?;
    info!(
        mode = %config.adapter_mode,
        sources = registry.enabled().count(),
        "ingestion pipeline configured"
    );

    let pipeline = Arc::new(IngestPipeline::new(
        store.clone(),
        adapter,
        registry,
        PipelineSettings {
            inter_source_delay: config.inter_source_delay,
            fetch_timeout: config.fetch_timeout,
            tz: config.timezone,
        },
    ));
    let maintenance = Maintenance::new(store.clone(), config.retention_days);
    let scheduler = Scheduler::new(
        pipeline.clone(),
        SchedulerConfig {
            triggers: config.triggers.clone(),
            tz: config.timezone,
            boot_delay: config.boot_delay,
            maintenance: config.retention_cleanup.then(|| maintenance.clone()),
        },
    );

    Ok(Services {
        config,
        store,
        pipeline,
        maintenance,
        scheduler,
    })
}

pub async fn run_sync_once_from_env() -> Result<RunResult> {
    let services = build_services(SyncConfig::from_env()?).await?;
    let result = services.pipeline.run_once().await.context("ingestion run")?;
    services.store.close().await;
    Ok(result)
}
