//! Source adapter contracts + live and synthetic adapter implementations.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::FixedOffset;
use govwire_core::CandidateRecord;
use govwire_storage::{FetchError, HttpClientConfig, HttpFetcher};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod live;
mod registry;
mod synthetic;

pub use live::{extract_candidates, parse_published_date, resolve_link, LiveAdapter};
pub use registry::{SelectorSet, SourceConfig, SourceRegistry};
pub use synthetic::SyntheticAdapter;

pub const CRATE_NAME: &str = "govwire-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unknown source: {0}")]
    UnknownSource(String),
    #[error("unknown adapter mode {0:?} (expected `live` or `synthetic`)")]
    InvalidMode(String),
}

/// Produces the current batch of candidates for one source.
///
/// Implementations may fail independently; the caller records the failure and
/// moves on to the next source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CandidateRecord>, AdapterError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterMode {
    Live,
    #[default]
    Synthetic,
}

impl FromStr for AdapterMode {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "synthetic" | "demo" => Ok(Self::Synthetic),
            other => Err(AdapterError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for AdapterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// Resolve the configured mode into a concrete adapter once, at startup.
pub fn adapter_for_mode(
    mode: AdapterMode,
    http: HttpClientConfig,
    tz: FixedOffset,
) -> Result<Box<dyn SourceAdapter>, AdapterError> {
    match mode {
        AdapterMode::Live => Ok(Box::new(LiveAdapter::new(HttpFetcher::new(http)?, tz))),
        AdapterMode::Synthetic => Ok(Box::new(SyntheticAdapter::new(tz))),
    }
}
