//! Core domain model for govwire: ingested records, adapter candidates, run results.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const CRATE_NAME: &str = "govwire-core";

/// Stable content key used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// SHA-256 over `normalize(title) + "_" + source_id`, hex encoded.
///
/// Trimming and lowercasing happen before hashing, so `"Foo "` and `"foo"`
/// collide for the same source while the same title under two sources does not.
pub fn fingerprint(title: &str, source_id: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(normalize_title(title).as_bytes());
    hasher.update(b"_");
    hasher.update(source_id.as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Adapter handoff contract: one announcement as seen upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub title: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Insert payload handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub title: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub source_id: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub fingerprint: Fingerprint,
}

impl NewRecord {
    pub fn from_candidate(
        candidate: CandidateRecord,
        source_id: &str,
        source_name: &str,
        ingested_at: DateTime<Utc>,
    ) -> Self {
        let fingerprint = fingerprint(&candidate.title, source_id);
        Self {
            title: candidate.title,
            summary: candidate.summary,
            url: candidate.url,
            source_id: source_id.to_string(),
            source_name: source_name.to_string(),
            published_at: candidate.published_at,
            ingested_at,
            fingerprint,
        }
    }
}

/// Persisted announcement. Only `active` and `updated_at` ever change after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub source_id: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active: bool,
    pub fingerprint: Fingerprint,
}

/// Counters added to the `(date, source)` statistics row after a source is processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatDelta {
    pub total_seen: i64,
    pub new_items: i64,
    pub errors: i64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStat {
    pub stat_date: NaiveDate,
    pub source_id: String,
    pub total_seen: i64,
    pub new_items: i64,
    pub errors: i64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSuccess {
    pub source_id: String,
    pub source_name: String,
    pub new_items: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source_id: String,
    pub source_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_new: usize,
    pub total_processed: usize,
}

/// Aggregated outcome of one pass over every configured source.
///
/// A result carrying both successes and errors is a partial success, not a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: Vec<SourceSuccess>,
    pub errors: Vec<SourceError>,
    pub summary: RunSummary,
}

impl RunResult {
    pub fn record_success(&mut self, success: SourceSuccess) {
        self.summary.total_new += success.new_items;
        self.summary.total_processed += success.total;
        self.success.push(success);
    }

    pub fn record_error(&mut self, error: SourceError) {
        self.errors.push(error);
    }

    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty() && !self.success.is_empty()
    }
}
