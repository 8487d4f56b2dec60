//! Offline adapter producing plausible announcements from per-source templates.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use govwire_core::{fingerprint, CandidateRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::registry::SourceConfig;
use crate::{AdapterError, SourceAdapter};

const MIN_ITEMS: usize = 3;
const MAX_ITEMS: usize = 5;

/// Generates 3-5 candidates per source per local day.
///
/// The RNG is seeded from `(source_id, local date)`, so every run on the same
/// day yields the same titles and a new day yields fresh ones. Publish times
/// step back from the run instant across roughly the last 24 hours.
#[derive(Debug, Clone)]
pub struct SyntheticAdapter {
    tz: FixedOffset,
    pinned_date: Option<NaiveDate>,
}

impl SyntheticAdapter {
    pub fn new(tz: FixedOffset) -> Self {
        Self {
            tz,
            pinned_date: None,
        }
    }

    /// Always generate for `date`, as if run at 23:59 local time that day.
    pub fn for_date(tz: FixedOffset, date: NaiveDate) -> Self {
        Self {
            tz,
            pinned_date: Some(date),
        }
    }

    fn run_instant(&self) -> Result<DateTime<Utc>, AdapterError> {
        let Some(date) = self.pinned_date else {
            return Ok(Utc::now());
        };
        date.and_hms_opt(23, 59, 0)
            .and_then(|naive| self.tz.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| AdapterError::Parse(format!("no local end of day for {date}")))
    }

    /// Batch for a run at `now`; titles carry the local date of `now`.
    pub fn generate(&self, source: &SourceConfig, now: DateTime<Utc>) -> Result<Vec<CandidateRecord>, AdapterError> {
        if source.templates.is_empty() {
            return Err(AdapterError::Parse(format!(
                "no synthetic templates configured for {}",
                source.source_id
            )));
        }

        let date = now.with_timezone(&self.tz).date_naive();
        let mut rng = StdRng::seed_from_u64(seed_for(&source.source_id, date));
        let count = rng.gen_range(MIN_ITEMS..=MAX_ITEMS).min(source.templates.len());
        let picked = source
            .templates
            .choose_multiple(&mut rng, count)
            .cloned()
            .collect::<Vec<_>>();

        let mut out = Vec::with_capacity(picked.len());
        for (i, template) in picked.into_iter().enumerate() {
            // Newest first, at most ~20h back.
            let hours_back = (i as i64) * 4 + rng.gen_range(0..4);
            let published_at = now - Duration::hours(hours_back) - Duration::minutes(rng.gen_range(0..60));
            out.push(CandidateRecord {
                title: format!("{template} - {}월 {}일", date.month(), date.day()),
                summary: Some(format!(
                    "{}에서 \"{template}\"에 대한 상세 정책 방향과 실행 계획을 발표했습니다. 관련 업계와 국민들의 높은 관심이 예상됩니다.",
                    source.display_name
                )),
                url: Some(format!(
                    "{}/news/{}-{i}",
                    source.base_url.trim_end_matches('/'),
                    date.format("%Y%m%d")
                )),
                published_at,
            });
        }
        Ok(out)
    }
}

fn seed_for(source_id: &str, date: NaiveDate) -> u64 {
    let digest = fingerprint(&date.to_string(), source_id);
    u64::from_str_radix(&digest.as_str()[..16], 16).unwrap_or_default()
}

#[async_trait]
impl SourceAdapter for SyntheticAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CandidateRecord>, AdapterError> {
        self.generate(source, self.run_instant()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;
    use std::collections::HashSet;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn same_day_yields_identical_batches() {
        let registry = SourceRegistry::builtin();
        let fsc = registry.get("fsc").unwrap();
        let adapter = SyntheticAdapter::for_date(kst(), day(2));

        let first = adapter.fetch(fsc).await.unwrap();
        let second = adapter.fetch(fsc).await.unwrap();

        assert_eq!(first, second);
        assert!((MIN_ITEMS..=MAX_ITEMS).contains(&first.len()));
        let titles = first.iter().map(|c| c.title.clone()).collect::<HashSet<_>>();
        assert_eq!(titles.len(), first.len(), "no repeated titles within a batch");
        assert!(first.iter().all(|c| c.title.ends_with("3월 2일")));
    }

    #[tokio::test]
    async fn new_day_yields_new_titles() {
        let registry = SourceRegistry::builtin();
        let fss = registry.get("fss").unwrap();

        let monday = SyntheticAdapter::for_date(kst(), day(2)).fetch(fss).await.unwrap();
        let tuesday = SyntheticAdapter::for_date(kst(), day(3)).fetch(fss).await.unwrap();

        let monday_titles = monday.iter().map(|c| &c.title).collect::<HashSet<_>>();
        assert!(tuesday.iter().all(|c| !monday_titles.contains(&c.title)));
    }

    #[test]
    fn published_times_fall_within_the_last_day() {
        let registry = SourceRegistry::builtin();
        let adapter = SyntheticAdapter::new(kst());
        let now = kst().with_ymd_and_hms(2026, 3, 7, 10, 30, 0).unwrap().with_timezone(&Utc);
        for source in registry.enabled() {
            let batch = adapter.generate(source, now).unwrap();
            assert!(batch.windows(2).all(|w| w[0].published_at >= w[1].published_at));
            for candidate in batch {
                assert!(candidate.published_at <= now);
                assert!(candidate.published_at > now - Duration::hours(24));
                assert!(candidate.title.ends_with("3월 7일"));
                assert!(candidate.url.as_deref().unwrap().starts_with(&source.base_url));
            }
        }
    }

    #[tokio::test]
    async fn pinned_date_keeps_publish_times_on_that_day() {
        let registry = SourceRegistry::builtin();
        let adapter = SyntheticAdapter::for_date(kst(), day(2));
        for source in registry.enabled() {
            for candidate in adapter.fetch(source).await.unwrap() {
                assert_eq!(candidate.published_at.with_timezone(&kst()).date_naive(), day(2));
            }
        }
    }

    #[test]
    fn source_without_templates_is_an_error() {
        let mut source = SourceRegistry::builtin().sources.remove(0);
        source.templates.clear();
        let err = SyntheticAdapter::new(kst()).generate(&source, Utc::now()).unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
    }
}
