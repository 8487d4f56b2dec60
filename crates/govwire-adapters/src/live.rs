//! Listing-page adapter: HTTP GET + per-source CSS selectors.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use govwire_core::CandidateRecord;
use govwire_storage::HttpFetcher;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::registry::SourceConfig;
use crate::{AdapterError, SourceAdapter};

#[derive(Debug, Clone)]
pub struct LiveAdapter {
    http: HttpFetcher,
    tz: FixedOffset,
}

impl LiveAdapter {
    pub fn new(http: HttpFetcher, tz: FixedOffset) -> Self {
        Self { http, tz }
    }
}

#[async_trait]
impl SourceAdapter for LiveAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CandidateRecord>, AdapterError> {
        let response = self.http.fetch_bytes(&source.source_id, &source.news_url).await?;
        let fetched_at = Utc::now();
        // Html is !Send; parse only after the last await.
        let candidates = extract_candidates(source, &response.text_lossy(), fetched_at, self.tz)?;
        debug!(source_id = %source.source_id, rows = candidates.len(), "extracted listing rows");
        Ok(candidates)
    }
}

fn parse_selector(raw: &str) -> Result<Selector, AdapterError> {
    Selector::parse(raw).map_err(|e| AdapterError::Parse(format!("invalid selector {raw:?}: {e}")))
}

fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn first_text(row: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector)
        .next()
        .and_then(|n| text_or_none(n.text().collect::<String>()))
}

fn first_attr(row: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    row.select(selector)
        .next()
        .and_then(|n| n.value().attr(attr))
        .and_then(|s| text_or_none(s.to_string()))
}

/// Absolute links pass through; anything else is joined onto `base_url`.
pub fn resolve_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}

/// Parse `YYYY-MM-DD`, `YYYY.MM.DD`, `YYYY/MM/DD` or `YYYY년 M월 D일` as local
/// midnight in `tz`.
pub fn parse_published_date(text: &str, tz: FixedOffset) -> Option<DateTime<Utc>> {
    let parts = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .take(3)
        .map(|s| s.parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    let (year, month, day) = match parts.as_slice() {
        [y, m, d] if *y >= 1000 => (*y, *m, *d),
        _ => return None,
    };
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn summary_for(source: &SourceConfig, title: &str) -> String {
    format!("{}에서 발표한 \"{}\" 보도자료입니다.", source.display_name, title)
}

/// Pull candidate rows out of a listing page. Rows without a title are skipped;
/// an unparseable date falls back to `fetched_at`.
pub fn extract_candidates(
    source: &SourceConfig,
    html: &str,
    fetched_at: DateTime<Utc>,
    tz: FixedOffset,
) -> Result<Vec<CandidateRecord>, AdapterError> {
    let articles = parse_selector(&source.selectors.articles)?;
    let title_sel = parse_selector(&source.selectors.title)?;
    let link_sel = parse_selector(&source.selectors.link)?;
    let date_sel = parse_selector(&source.selectors.date)?;

    let document = Html::parse_document(html);
    let mut out = Vec::new();
    for row in document.select(&articles) {
        let Some(title) = first_text(&row, &title_sel) else {
            continue;
        };
        let url = first_attr(&row, &link_sel, "href").map(|href| resolve_link(&source.base_url, &href));
        let published_at = match first_text(&row, &date_sel) {
            Some(raw) => parse_published_date(&raw, tz).unwrap_or_else(|| {
                warn!(source_id = %source.source_id, raw = %raw, "unparseable listing date; using fetch time");
                fetched_at
            }),
            None => fetched_at,
        };
        out.push(CandidateRecord {
            summary: Some(summary_for(source, &title)),
            title,
            url,
            published_at,
        });
    }
    Ok(out)
}
