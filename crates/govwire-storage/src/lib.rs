//! Persistence + HTTP fetch utilities for govwire.

mod http;
mod store;

pub use http::{
    is_transient_error, is_transient_status, FetchError, FetchedResponse, HttpClientConfig,
    HttpFetcher, RetryPolicy,
};
pub use store::{
    InsertOutcome, Page, RecordFilter, RecordOrder, RecordStore, SourceCount, SqliteRecordStore,
    StoreError, StoreStats,
};

pub const CRATE_NAME: &str = "govwire-storage";
