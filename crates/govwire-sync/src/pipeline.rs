//! One ingestion pass over every enabled source.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{FixedOffset, NaiveDate, Utc};
use govwire_adapters::{SourceAdapter, SourceConfig, SourceRegistry};
use govwire_core::{NewRecord, RunResult, RunStatDelta, SourceError, SourceSuccess};
use govwire_storage::{RecordStore, StoreError};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::dedup::{Admission, Deduplicator};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The store is unreachable; nothing further in the run can be persisted.
    #[error("record store unavailable: {0}")]
    Store(#[source] StoreError),
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub inter_source_delay: Duration,
    pub fetch_timeout: Duration,
    /// Zone whose calendar date keys the run statistics.
    pub tz: FixedOffset,
}

#[derive(Debug, Clone, Copy, Default)]
struct SourceTally {
    new_items: usize,
    total: usize,
}

enum SourceFailure {
    Fetch(String),
    Fatal(StoreError),
}

pub struct IngestPipeline {
    store: Arc<dyn RecordStore>,
    adapter: Box<dyn SourceAdapter>,
    registry: SourceRegistry,
    dedup: Deduplicator,
    settings: PipelineSettings,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        adapter: Box<dyn SourceAdapter>,
        registry: SourceRegistry,
        settings: PipelineSettings,
    ) -> Self {
        let dedup = Deduplicator::new(store.clone());
        Self {
            store,
            adapter,
            registry,
            dedup,
            settings,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Visit every enabled source in registry order.
    ///
    /// Per-source failures land in `RunResult::errors` and the run continues.
    /// Only an unreachable store aborts the run.
    pub async fn run_once(&self) -> Result<RunResult, PipelineError> {
        let sources = self.registry.enabled().collect::<Vec<_>>();
        let run_date = Utc::now().with_timezone(&self.settings.tz).date_naive();
        let mut result = RunResult::default();

        for (index, source) in sources.iter().enumerate() {
            let clock = Instant::now();
            let span = info_span!("ingest_source", source_id = %source.source_id);
            let outcome = self.process_source(source).instrument(span).await;
            let duration_ms = i64::try_from(clock.elapsed().as_millis()).unwrap_or(i64::MAX);

            let delta = match outcome {
                Ok(tally) => {
                    info!(
                        source_id = %source.source_id,
                        new_items = tally.new_items,
                        total = tally.total,
                        duration_ms,
                        "source ingested"
                    );
                    result.record_success(SourceSuccess {
                        source_id: source.source_id.clone(),
                        source_name: source.display_name.clone(),
                        new_items: tally.new_items,
                        total: tally.total,
                    });
                    RunStatDelta {
                        total_seen: tally.total as i64,
                        new_items: tally.new_items as i64,
                        errors: 0,
                        duration_ms,
                    }
                }
                Err(SourceFailure::Fetch(error)) => {
                    warn!(source_id = %source.source_id, error = %error, "source failed");
                    result.record_error(SourceError {
                        source_id: source.source_id.clone(),
                        source_name: source.display_name.clone(),
                        error,
                    });
                    RunStatDelta {
                        errors: 1,
                        duration_ms,
                        ..RunStatDelta::default()
                    }
                }
                Err(SourceFailure::Fatal(err)) => return Err(PipelineError::Store(err)),
            };

            self.record_stat(run_date, &source.source_id, &delta).await?;

            if index + 1 < sources.len() && !self.settings.inter_source_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_source_delay).await;
            }
        }

        info!(
            total_new = result.summary.total_new,
            total_processed = result.summary.total_processed,
            failed_sources = result.errors.len(),
            "ingestion pass finished"
        );
        Ok(result)
    }

    async fn process_source(&self, source: &SourceConfig) -> Result<SourceTally, SourceFailure> {
        let fetched = tokio::time::timeout(self.settings.fetch_timeout, self.adapter.fetch(source)).await;
        let candidates = match fetched {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(err)) => return Err(SourceFailure::Fetch(err.to_string())),
            Err(_) => {
                return Err(SourceFailure::Fetch(format!(
                    "fetch timed out after {}s",
                    self.settings.fetch_timeout.as_secs_f64()
                )))
            }
        };

        let ingested_at = Utc::now();
        let mut tally = SourceTally {
            total: candidates.len(),
            ..SourceTally::default()
        };
        for candidate in candidates {
            if candidate.title.trim().is_empty() {
                debug!("candidate without title skipped");
                continue;
            }
            let record = NewRecord::from_candidate(candidate, &source.source_id, &source.display_name, ingested_at);
            match self.dedup.admit(&record).await {
                Ok(Admission::Stored(id)) => {
                    debug!(id, title = %record.title, "new record");
                    tally.new_items += 1;
                }
                Ok(Admission::Duplicate) => {}
                Err(err) if err.is_unavailable() => return Err(SourceFailure::Fatal(err)),
                Err(err) => {
                    warn!(title = %record.title, error = %err, "record rejected by store; skipping");
                }
            }
        }
        Ok(tally)
    }

    async fn record_stat(
        &self,
        date: NaiveDate,
        source_id: &str,
        delta: &RunStatDelta,
    ) -> Result<(), PipelineError> {
        match self.store.upsert_run_stat(date, source_id, delta).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_unavailable() => Err(PipelineError::Store(err)),
            Err(err) => {
                warn!(source_id, error = %err, "run statistics not recorded");
                Ok(())
            }
        }
    }
}
