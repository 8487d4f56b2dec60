//! Test doubles shared by the sync crate's unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use govwire_adapters::{AdapterError, SourceAdapter, SourceConfig, SourceRegistry};
use govwire_core::CandidateRecord;
use govwire_storage::SqliteRecordStore;
use tempfile::{tempdir, TempDir};

use crate::pipeline::{IngestPipeline, PipelineSettings};

pub(crate) async fn temp_store() -> (TempDir, Arc<SqliteRecordStore>) {
    let dir = tempdir().expect("tempdir");
    let store = SqliteRecordStore::open_path(dir.path().join("govwire.db"))
        .await
        .expect("open store");
    (dir, Arc::new(store))
}

pub(crate) fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("kst")
}

pub(crate) fn candidate(title: &str) -> CandidateRecord {
    CandidateRecord {
        title: title.to_string(),
        summary: None,
        url: None,
        published_at: Utc::now(),
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Script {
    Items(Vec<CandidateRecord>),
    Fail(String),
    Slow(Duration, Vec<CandidateRecord>),
}

/// Adapter returning canned batches per source id and recording call order.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedAdapter {
    scripts: HashMap<String, Script>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedAdapter {
    pub fn with(mut self, source_id: &str, script: Script) -> Self {
        self.scripts.insert(source_id.to_string(), script);
        self
    }

    pub fn items(self, source_id: &str, titles: &[&str]) -> Self {
        self.with(source_id, Script::Items(titles.iter().map(|t| candidate(t)).collect()))
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CandidateRecord>, AdapterError> {
        self.calls.lock().expect("calls").push(source.source_id.clone());
        match self.scripts.get(&source.source_id) {
            Some(Script::Items(items)) => Ok(items.clone()),
            Some(Script::Fail(msg)) => Err(AdapterError::Parse(msg.clone())),
            Some(Script::Slow(delay, items)) => {
                tokio::time::sleep(*delay).await;
                Ok(items.clone())
            }
            None => Err(AdapterError::UnknownSource(source.source_id.clone())),
        }
    }
}

/// Built-in sources restricted to `ids`, in the given order.
pub(crate) fn registry(ids: &[&str]) -> SourceRegistry {
    let builtin = SourceRegistry::builtin();
    SourceRegistry {
        sources: ids
            .iter()
            .filter_map(|id| builtin.get(id).cloned())
            .collect(),
    }
}

pub(crate) fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        inter_source_delay: Duration::ZERO,
        fetch_timeout: Duration::from_secs(5),
        tz: kst(),
    }
}

pub(crate) fn pipeline(
    store: Arc<SqliteRecordStore>,
    adapter: ScriptedAdapter,
    ids: &[&str],
) -> IngestPipeline {
    IngestPipeline::new(store, Box::new(adapter), registry(ids), fast_settings())
}
