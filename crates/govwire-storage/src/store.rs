//! Durable record + run statistics store backed by SQLite through sqlx.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use govwire_core::{Fingerprint, NewRecord, Record, RunStat, RunStatDelta};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use thiserror::Error;
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        summary TEXT,
        url TEXT,
        source_id TEXT NOT NULL,
        source_name TEXT NOT NULL,
        published_at TEXT NOT NULL,
        ingested_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        fingerprint TEXT NOT NULL UNIQUE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_records_source_id ON records(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_records_published_at ON records(published_at)",
    "CREATE INDEX IF NOT EXISTS idx_records_ingested_at ON records(ingested_at)",
    "CREATE INDEX IF NOT EXISTS idx_records_active ON records(active)",
    r#"
    CREATE TABLE IF NOT EXISTS run_stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        stat_date TEXT NOT NULL,
        source_id TEXT NOT NULL,
        total_seen INTEGER NOT NULL DEFAULT 0,
        new_items INTEGER NOT NULL DEFAULT 0,
        errors INTEGER NOT NULL DEFAULT 0,
        duration_ms INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(stat_date, source_id)
    )
    "#,
];

const RECORD_COLUMNS: &str = "id, title, summary, url, source_id, source_name, published_at, \
     ingested_at, created_at, updated_at, active, fingerprint";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached at all: pool closed or timed out, IO failure.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    /// A single statement was refused; the store itself is healthy.
    #[error("store rejected statement: {0}")]
    Rejected(#[source] sqlx::Error),
    #[error("schema migration failed: {0}")]
    Migrate(#[source] sqlx::Error),
    #[error("invalid database url {url}: {reason}")]
    Config { url: String, reason: String },
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_) => StoreError::Unavailable(err),
            other => StoreError::Rejected(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    pub id: Option<i64>,
    pub duplicate: bool,
}

impl InsertOutcome {
    pub fn inserted(id: i64) -> Self {
        Self {
            id: Some(id),
            duplicate: false,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            id: None,
            duplicate: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub source_id: Option<String>,
    /// Inclusive lower bound on `published_at`.
    pub since: Option<DateTime<Utc>>,
}

impl RecordFilter {
    pub fn source(source_id: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            since: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrder {
    #[default]
    PublishedDesc,
    PublishedAsc,
    IngestedDesc,
}

impl RecordOrder {
    fn sql(self) -> &'static str {
        match self {
            RecordOrder::PublishedDesc => " ORDER BY published_at DESC, created_at DESC, id DESC",
            RecordOrder::PublishedAsc => " ORDER BY published_at ASC, created_at ASC, id ASC",
            RecordOrder::IngestedDesc => " ORDER BY ingested_at DESC, id DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.max(1),
            offset: offset.max(0),
        }
    }

    /// 1-based page number into a page window. Offsets past `i64::MAX`
    /// saturate, which simply selects nothing.
    pub fn number(page: i64, limit: i64) -> Self {
        let limit = limit.max(1);
        Self::new(limit, page.max(1).saturating_sub(1).saturating_mul(limit))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source_id: String,
    pub source_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: i64,
    pub today: i64,
    pub this_week: i64,
    pub by_source: Vec<SourceCount>,
}

/// Persistence contract consumed by the ingestion pipeline and the web surface.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record. A fingerprint collision (active or not) is reported
    /// as `duplicate: true` instead of an error.
    async fn insert(&self, record: &NewRecord) -> Result<InsertOutcome, StoreError>;

    async fn find_active_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError>;

    async fn query_active(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
        page: Option<Page>,
    ) -> Result<Vec<Record>, StoreError>;

    async fn count(&self, filter: &RecordFilter) -> Result<i64, StoreError>;

    async fn upsert_run_stat(
        &self,
        date: NaiveDate,
        source_id: &str,
        delta: &RunStatDelta,
    ) -> Result<(), StoreError>;

    async fn run_stats_for(&self, date: NaiveDate) -> Result<Vec<RunStat>, StoreError>;

    /// Soft-delete active records published more than `retention_days` before `now`.
    async fn deactivate_older_than(
        &self,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    async fn stats(&self, now: DateTime<Utc>, tz: FixedOffset) -> Result<StoreStats, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Connect using a `sqlite://` url, creating the database file and its
    /// directory when missing, then apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url).map_err(|e| StoreError::Config {
            url: database_url.to_string(),
            reason: e.to_string(),
        })?;
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| StoreError::Unavailable(sqlx::Error::Io(e)))?;
                }
            }
        }
        // Every in-memory connection is its own database; keep exactly one.
        let max_connections = if in_memory { 1 } else { 5 };
        Self::with_options(options, max_connections).await
    }

    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().filename(path.as_ref());
        Self::with_options(options, 5).await
    }

    async fn with_options(options: SqliteConnectOptions, max_connections: u32) -> Result<Self, StoreError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if absent. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(StoreError::Migrate)?;
        }
        debug!("record store schema ensured");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn record_from_row(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let fingerprint: String = row.try_get("fingerprint")?;
    Ok(Record {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        url: row.try_get("url")?,
        source_id: row.try_get("source_id")?,
        source_name: row.try_get("source_name")?,
        published_at: row.try_get("published_at")?,
        ingested_at: row.try_get("ingested_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        active: row.try_get("active")?,
        fingerprint: Fingerprint::from_hex(fingerprint),
    })
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RecordFilter) {
    if let Some(source_id) = &filter.source_id {
        qb.push(" AND source_id = ").push_bind(source_id.clone());
    }
    if let Some(since) = filter.since {
        qb.push(" AND published_at >= ").push_bind(since);
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: &NewRecord) -> Result<InsertOutcome, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO records (
                title, summary, url, source_id, source_name,
                published_at, ingested_at, created_at, updated_at, active, fingerprint
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&record.title)
        .bind(&record.summary)
        .bind(&record.url)
        .bind(&record.source_id)
        .bind(&record.source_name)
        .bind(record.published_at)
        .bind(record.ingested_at)
        .bind(now)
        .bind(now)
        .bind(record.fingerprint.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                debug!(id, source_id = %record.source_id, title = %record.title, "record stored");
                Ok(InsertOutcome::inserted(id))
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!(source_id = %record.source_id, title = %record.title, "duplicate fingerprint skipped");
                Ok(InsertOutcome::duplicate())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_active_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT id FROM records WHERE fingerprint = ? AND active = 1")
            .bind(fingerprint.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn query_active(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
        page: Option<Page>,
    ) -> Result<Vec<Record>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE active = 1"
        ));
        push_filter(&mut qb, filter);
        qb.push(order.sql());
        if let Some(page) = page {
            qb.push(" LIMIT ")
                .push_bind(page.limit)
                .push(" OFFSET ")
                .push_bind(page.offset);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(record_from_row(row)?);
        }
        Ok(out)
    }

    async fn count(&self, filter: &RecordFilter) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS count FROM records WHERE active = 1");
        push_filter(&mut qb, filter);
        let row = qb.build().fetch_one(&self.pool).await?;
        Ok(row.try_get("count")?)
    }

    async fn upsert_run_stat(
        &self,
        date: NaiveDate,
        source_id: &str,
        delta: &RunStatDelta,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO run_stats (
                stat_date, source_id, total_seen, new_items, errors, duration_ms, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(stat_date, source_id) DO UPDATE SET
                total_seen = total_seen + excluded.total_seen,
                new_items = new_items + excluded.new_items,
                errors = errors + excluded.errors,
                duration_ms = duration_ms + excluded.duration_ms,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(date)
        .bind(source_id)
        .bind(delta.total_seen)
        .bind(delta.new_items)
        .bind(delta.errors)
        .bind(delta.duration_ms)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn run_stats_for(&self, date: NaiveDate) -> Result<Vec<RunStat>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT stat_date, source_id, total_seen, new_items, errors, duration_ms
              FROM run_stats
             WHERE stat_date = ?
             ORDER BY source_id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(RunStat {
                stat_date: row.try_get("stat_date")?,
                source_id: row.try_get("source_id")?,
                total_seen: row.try_get("total_seen")?,
                new_items: row.try_get("new_items")?,
                errors: row.try_get("errors")?,
                duration_ms: row.try_get("duration_ms")?,
            });
        }
        Ok(out)
    }

    async fn deactivate_older_than(
        &self,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let cutoff = now - chrono::Duration::days(i64::from(retention_days));
        let done = sqlx::query(
            r#"
            UPDATE records
               SET active = 0, updated_at = ?
             WHERE active = 1
               AND published_at < ?
            "#,
        )
        .bind(now)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        let changed = done.rows_affected();
        info!(changed, retention_days, %cutoff, "deactivated records past retention");
        Ok(changed)
    }

    async fn stats(&self, now: DateTime<Utc>, tz: FixedOffset) -> Result<StoreStats, StoreError> {
        let local_midnight = now
            .with_timezone(&tz)
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| tz.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);
        let week_ago = now - chrono::Duration::days(7);

        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN ingested_at >= ? THEN 1 ELSE 0 END), 0) AS today,
                   COALESCE(SUM(CASE WHEN ingested_at >= ? THEN 1 ELSE 0 END), 0) AS this_week
              FROM records
             WHERE active = 1
            "#,
        )
        .bind(local_midnight)
        .bind(week_ago)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT source_id, source_name, COUNT(*) AS count
              FROM records
             WHERE active = 1
             GROUP BY source_id, source_name
             ORDER BY count DESC, source_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_source = Vec::with_capacity(rows.len());
        for row in rows {
            by_source.push(SourceCount {
                source_id: row.try_get("source_id")?,
                source_name: row.try_get("source_name")?,
                count: row.try_get("count")?,
            });
        }

        Ok(StoreStats {
            total: totals.try_get("total")?,
            today: totals.try_get("today")?,
            this_week: totals.try_get("this_week")?,
            by_source,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use govwire_core::fingerprint;
    use tempfile::{tempdir, TempDir};

    async fn temp_store() -> (TempDir, SqliteRecordStore) {
        let dir = tempdir().expect("tempdir");
        let store = SqliteRecordStore::open_path(dir.path().join("govwire.db"))
            .await
            .expect("open store");
        (dir, store)
    }

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("ts")
    }

    fn new_record(title: &str, source_id: &str, published_at: DateTime<Utc>) -> NewRecord {
        NewRecord {
            title: title.to_string(),
            summary: Some(format!("{title} summary")),
            url: Some(format!("https://{source_id}.example.go.kr/{title}")),
            source_id: source_id.to_string(),
            source_name: source_id.to_uppercase(),
            published_at,
            ingested_at: published_at,
            fingerprint: fingerprint(title, source_id),
        }
    }

    #[tokio::test]
    async fn duplicate_fingerprint_is_an_outcome_not_an_error() {
        let (_dir, store) = temp_store().await;
        let record = new_record("Budget plan", "fsc", ts(2026, 3, 2, 9));

        let first = store.insert(&record).await.expect("first insert");
        let second = store.insert(&record).await.expect("second insert");

        assert!(!first.duplicate);
        assert!(first.id.is_some());
        assert!(second.duplicate);
        assert_eq!(second.id, None);
        assert_eq!(store.count(&RecordFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn racing_inserts_store_exactly_one_row() {
        let (_dir, store) = temp_store().await;
        let record = new_record("Race", "ftc", ts(2026, 3, 2, 9));

        let (a, b) = tokio::join!(store.insert(&record), store.insert(&record));
        let outcomes = [a.expect("a"), b.expect("b")];

        assert_eq!(outcomes.iter().filter(|o| !o.duplicate).count(), 1);
        assert_eq!(outcomes.iter().filter(|o| o.duplicate).count(), 1);
        assert_eq!(store.count(&RecordFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn query_active_filters_orders_and_pages() {
        let (_dir, store) = temp_store().await;
        store.insert(&new_record("old", "fsc", ts(2026, 3, 1, 9))).await.unwrap();
        store.insert(&new_record("mid", "fsc", ts(2026, 3, 2, 9))).await.unwrap();
        store.insert(&new_record("new", "fsc", ts(2026, 3, 3, 9))).await.unwrap();
        store.insert(&new_record("other", "fss", ts(2026, 3, 4, 9))).await.unwrap();

        let fsc = RecordFilter::source("fsc");
        let all = store
            .query_active(&fsc, RecordOrder::PublishedDesc, None)
            .await
            .unwrap();
        let titles = all.iter().map(|r| r.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["new", "mid", "old"]);

        let second_page = store
            .query_active(&fsc, RecordOrder::PublishedDesc, Some(Page::number(2, 2)))
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].title, "old");

        let far_page = Page::number(i64::MAX, 100);
        assert_eq!(far_page.offset, i64::MAX);
        let beyond = store
            .query_active(&fsc, RecordOrder::PublishedDesc, Some(far_page))
            .await
            .unwrap();
        assert!(beyond.is_empty());

        let since = RecordFilter {
            source_id: None,
            since: Some(ts(2026, 3, 3, 0)),
        };
        assert_eq!(store.count(&since).await.unwrap(), 2);
        assert_eq!(store.count(&fsc).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn retention_soft_deletes_and_is_idempotent() {
        let (_dir, store) = temp_store().await;
        let now = ts(2026, 4, 30, 12);
        store.insert(&new_record("stale-1", "fsc", now - chrono::Duration::days(45))).await.unwrap();
        store.insert(&new_record("stale-2", "fss", now - chrono::Duration::days(31))).await.unwrap();
        store.insert(&new_record("fresh", "fsc", now - chrono::Duration::days(3))).await.unwrap();

        let first = store.deactivate_older_than(30, now).await.unwrap();
        let second = store.deactivate_older_than(30, now).await.unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        let remaining = store
            .query_active(&RecordFilter::default(), RecordOrder::default(), None)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "fresh");

        let stale_fp = fingerprint("stale-1", "fsc");
        assert!(!store.find_active_by_fingerprint(&stale_fp).await.unwrap());
        let reinsert = store
            .insert(&new_record("stale-1", "fsc", now))
            .await
            .unwrap();
        assert!(reinsert.duplicate, "inactive rows still own their fingerprint");
    }

    #[tokio::test]
    async fn run_stats_accumulate_per_day_and_source() {
        let (_dir, store) = temp_store().await;
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let delta = RunStatDelta {
            total_seen: 5,
            new_items: 2,
            errors: 0,
            duration_ms: 120,
        };

        store.upsert_run_stat(day, "fsc", &delta).await.unwrap();
        store.upsert_run_stat(day, "fsc", &delta).await.unwrap();
        store
            .upsert_run_stat(day, "fss", &RunStatDelta { errors: 1, ..Default::default() })
            .await
            .unwrap();

        let stats = store.run_stats_for(day).await.unwrap();
        assert_eq!(stats.len(), 2);
        let fsc = stats.iter().find(|s| s.source_id == "fsc").unwrap();
        assert_eq!(fsc.total_seen, 10);
        assert_eq!(fsc.new_items, 4);
        assert_eq!(fsc.duration_ms, 240);
        let fss = stats.iter().find(|s| s.source_id == "fss").unwrap();
        assert_eq!(fss.errors, 1);
    }

    #[tokio::test]
    async fn stats_count_active_records_by_source() {
        let (_dir, store) = temp_store().await;
        let now = Utc::now();
        store.insert(&new_record("a", "fsc", now)).await.unwrap();
        store.insert(&new_record("b", "fsc", now)).await.unwrap();
        store.insert(&new_record("c", "ftc", now)).await.unwrap();

        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let stats = store.stats(now, tz).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.this_week, 3);
        assert_eq!(stats.by_source[0].source_id, "fsc");
        assert_eq!(stats.by_source[0].count, 2);
    }

    #[tokio::test]
    async fn closed_pool_reports_unavailable() {
        let (_dir, store) = temp_store().await;
        store.close().await;
        let err = store.ping().await.expect_err("closed pool");
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn connect_creates_missing_directories() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/data/govwire.db");
        let url = format!("sqlite://{}", path.display());
        let store = SqliteRecordStore::connect(&url).await.expect("connect");
        store.ping().await.expect("ping");
        assert!(path.exists());
    }
}
