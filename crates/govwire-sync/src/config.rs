use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use govwire_adapters::AdapterMode;

use crate::scheduler::TriggerSpec;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/govwire.db";
pub const DEFAULT_TIMEZONE: &str = "+09:00";

/// Runtime configuration for ingestion, scheduling and retention.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database_url: String,
    pub sources_path: PathBuf,
    pub adapter_mode: AdapterMode,
    pub timezone: FixedOffset,
    pub triggers: Vec<TriggerSpec>,
    /// `None` disables the boot-time run.
    pub boot_delay: Option<Duration>,
    pub inter_source_delay: Duration,
    pub fetch_timeout: Duration,
    pub retention_days: u32,
    pub retention_cleanup: bool,
    pub user_agent: String,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timezone = parse_utc_offset(&get("GOVWIRE_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()))
            .context("GOVWIRE_TIMEZONE")?;
        let triggers = match get("GOVWIRE_TRIGGERS") {
            Some(raw) => parse_trigger_list(&raw, timezone).context("GOVWIRE_TRIGGERS")?,
            None => TriggerSpec::defaults(timezone),
        };
        let adapter_mode = match get("GOVWIRE_ADAPTER_MODE") {
            Some(raw) => raw.parse().context("GOVWIRE_ADAPTER_MODE")?,
            None => AdapterMode::default(),
        };
        let boot_delay = if parse_flag(get("GOVWIRE_BOOT_RUN").as_deref(), true) {
            Some(Duration::from_secs(parse_number(&get, "GOVWIRE_BOOT_DELAY_SECS", 5)?))
        } else {
            None
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            sources_path: get("GOVWIRE_SOURCES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("sources.yaml")),
            adapter_mode,
            timezone,
            triggers,
            boot_delay,
            inter_source_delay: Duration::from_millis(parse_number(&get, "GOVWIRE_INTER_SOURCE_DELAY_MS", 2000)?),
            fetch_timeout: Duration::from_secs(parse_number(&get, "GOVWIRE_FETCH_TIMEOUT_SECS", 30)?),
            retention_days: u32::try_from(parse_number(&get, "GOVWIRE_RETENTION_DAYS", 30)?)
                .context("GOVWIRE_RETENTION_DAYS out of range")?,
            retention_cleanup: parse_flag(get("GOVWIRE_RETENTION_CLEANUP").as_deref(), true),
            user_agent: get("GOVWIRE_USER_AGENT").unwrap_or_else(|| format!("govwire-bot/{}", env!("CARGO_PKG_VERSION"))),
        })
    }
}

fn parse_number(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match get(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key}={raw:?} is not a non-negative integer")),
        None => Ok(default),
    }
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(v) => matches!(v, "1" | "true" | "TRUE" | "True" | "yes" | "on"),
        None => default,
    }
}

/// Parse a fixed UTC offset: `UTC`, `Z`, `+09:00`, `-0530`, `+9`.
/// `Asia/Seoul` and `KST` are accepted as `+09:00`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).context("zero offset");
    }
    if s == "Asia/Seoul" || s.eq_ignore_ascii_case("kst") {
        return FixedOffset::east_opt(9 * 3600).context("KST offset");
    }

    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => bail!("timezone {raw:?} must be UTC or a signed offset like +09:00"),
    };
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit() || c == ':') {
        bail!("timezone {raw:?} must be UTC or a signed offset like +09:00");
    }
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().with_context(|| format!("bad hours in offset {raw:?}"))?;
    let minutes: i32 = minutes.parse().with_context(|| format!("bad minutes in offset {raw:?}"))?;
    if hours > 23 || minutes > 59 {
        bail!("offset {raw:?} out of range");
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).with_context(|| format!("offset {raw:?} out of range"))
}

/// `name=pattern;name=pattern`. Patterns are validated when the scheduler starts.
pub fn parse_trigger_list(raw: &str, tz: FixedOffset) -> Result<Vec<TriggerSpec>> {
    let mut out = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, pattern)) = entry.split_once('=') else {
            bail!("trigger entry {entry:?} must look like name=pattern");
        };
        let (name, pattern) = (name.trim(), pattern.trim());
        if name.is_empty() || pattern.is_empty() {
            bail!("trigger entry {entry:?} has an empty name or pattern");
        }
        out.push(TriggerSpec::new(name, pattern, tz));
    }
    Ok(out)
}
