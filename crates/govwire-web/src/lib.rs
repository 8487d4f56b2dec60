//! Axum JSON surface over the record store and the ingestion scheduler.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use govwire_core::Record;
use govwire_storage::{Page, RecordFilter, RecordOrder, RecordStore, StoreError};
use govwire_sync::{RunAttempt, RunOutcome, Scheduler, SchedulerStatus};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

pub const CRATE_NAME: &str = "govwire-web";

const DEFAULT_PAGE_SIZE: i64 = 6;
const DEFAULT_SOURCE_LIMIT: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub scheduler: Scheduler,
    pub tz: FixedOffset,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, scheduler: Scheduler) -> Self {
        let tz = scheduler.timezone();
        Self { store, scheduler, tz }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsQuery {
    #[serde(alias = "agency")]
    pub source: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// RFC 3339 instant or a `YYYY-MM-DD` local date.
    pub since: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub url: Option<String>,
    pub source_id: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    /// Local publication date for display.
    pub date: String,
}

impl NewsItem {
    fn from_record(record: Record, tz: FixedOffset) -> Self {
        Self {
            date: record.published_at.with_timezone(&tz).format("%Y-%m-%d").to_string(),
            id: record.id,
            title: record.title,
            summary: record.summary,
            url: record.url,
            source_id: record.source_id,
            source_name: record.source_name,
            published_at: record.published_at,
            ingested_at: record.ingested_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    fn new(page: i64, limit: i64, total_count: i64) -> Self {
        let total_pages = if total_count == 0 { 0 } else { (total_count + limit - 1) / limit };
        Self {
            page,
            limit,
            total_count,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    data: T,
    timestamp: DateTime<Utc>,
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope {
        success: true,
        data,
        timestamp: Utc::now(),
    })
    .into_response()
}

#[derive(Debug, Serialize)]
struct NewsPage {
    success: bool,
    data: Vec<NewsItem>,
    pagination: Pagination,
    source: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SourceNews {
    success: bool,
    data: Vec<NewsItem>,
    source: String,
    count: usize,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SchedulerView {
    #[serde(flatten)]
    status: SchedulerStatus,
    last_run: Option<RunOutcome>,
}

#[derive(Debug, Serialize)]
struct Health {
    success: bool,
    status: &'static str,
    total_news: Option<i64>,
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": message.into(),
            "timestamp": Utc::now(),
        })),
    )
        .into_response()
}

fn store_error(err: StoreError) -> Response {
    error!(error = %err, "store request failed");
    let status = if err.is_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    api_error(status, err.to_string())
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/news", get(news_handler))
        .route("/api/news/stats", get(stats_handler))
        .route("/api/news/source/{code}", get(source_handler))
        .route("/api/news/scheduler", get(scheduler_handler))
        .route("/api/news/scrape", post(scrape_handler))
        .route("/api/news/health", get(health_handler))
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http surface listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn parse_since(raw: &str, tz: FixedOffset) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

async fn news_handler(State(state): State<Arc<AppState>>, Query(query): Query<NewsQuery>) -> Response {
    let source = query
        .source
        .filter(|s| !s.is_empty() && s != "all")
        .unwrap_or_else(|| "all".to_string());
    let since = match query.since.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => match parse_since(raw, state.tz) {
            Some(since) => Some(since),
            None => return api_error(StatusCode::BAD_REQUEST, format!("invalid since value {raw:?}")),
        },
        None => None,
    };
    let filter = RecordFilter {
        source_id: (source != "all").then(|| source.clone()),
        since,
    };
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);

    let records = state
        .store
        .query_active(&filter, RecordOrder::PublishedDesc, Some(Page::number(page, limit)))
        .await;
    let total = state.store.count(&filter).await;
    match (records, total) {
        (Ok(records), Ok(total)) => Json(NewsPage {
            success: true,
            data: records.into_iter().map(|r| NewsItem::from_record(r, state.tz)).collect(),
            pagination: Pagination::new(page, limit, total),
            source,
            timestamp: Utc::now(),
        })
        .into_response(),
        (Err(err), _) | (_, Err(err)) => store_error(err),
    }
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.stats(Utc::now(), state.tz).await {
        Ok(stats) => ok(stats),
        Err(err) => store_error(err),
    }
}

async fn source_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_SOURCE_LIMIT).clamp(1, MAX_PAGE_SIZE);
    match state
        .store
        .query_active(&RecordFilter::source(code.clone()), RecordOrder::PublishedDesc, Some(Page::new(limit, 0)))
        .await
    {
        Ok(records) => {
            let data = records
                .into_iter()
                .map(|r| NewsItem::from_record(r, state.tz))
                .collect::<Vec<_>>();
            Json(SourceNews {
                success: true,
                count: data.len(),
                data,
                source: code,
                timestamp: Utc::now(),
            })
            .into_response()
        }
        Err(err) => store_error(err),
    }
}

async fn scheduler_handler(State(state): State<Arc<AppState>>) -> Response {
    ok(SchedulerView {
        status: state.scheduler.status(Utc::now()),
        last_run: state.scheduler.last_outcome(),
    })
}

async fn scrape_handler(State(state): State<Arc<AppState>>) -> Response {
    info!("manual ingestion requested");
    match state.scheduler.execute_run("manual").await {
        RunAttempt::Skipped => api_error(StatusCode::CONFLICT, "an ingestion run is already in progress"),
        RunAttempt::Completed(outcome) => match outcome.error.clone() {
            Some(err) => api_error(StatusCode::INTERNAL_SERVER_ERROR, err),
            None => ok(outcome),
        },
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let ping = match state.store.ping().await {
        Ok(()) => state.store.count(&RecordFilter::default()).await,
        Err(err) => Err(err),
    };
    match ping {
        Ok(total) => Json(Health {
            success: true,
            status: "healthy",
            total_news: Some(total),
            error: None,
            timestamp: Utc::now(),
        })
        .into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Health {
                success: false,
                status: "unhealthy",
                total_news: None,
                error: Some(err.to_string()),
                timestamp: Utc::now(),
            }),
        )
            .into_response(),
    }
}
