//! Wall-clock trigger loop with a single-flight run guard.
//!
//! Triggers are declarative [`TriggerSpec`]s compiled with the `cron` crate.
//! One tokio task sleeps until the earliest next fire time across every
//! trigger, fires whatever is due and recomputes. Each fired run goes through
//! [`Scheduler::execute_run`], which refuses to start while another run holds
//! the guard.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use govwire_core::RunResult;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::maintenance::{Maintenance, MAINTENANCE_PATTERN};
use crate::pipeline::IngestPipeline;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    pub name: String,
    /// Five-field `min hour dom month dow`, or six fields with leading seconds.
    pub pattern: String,
    pub tz: FixedOffset,
}

impl TriggerSpec {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, tz: FixedOffset) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            tz,
        }
    }

    /// Weekdays at 09:00, 13:00 and 17:00, Saturdays at 14:00.
    pub fn defaults(tz: FixedOffset) -> Vec<Self> {
        vec![
            Self::new("weekday-morning", "0 9 * * Mon-Fri", tz),
            Self::new("weekday-afternoon", "0 13 * * Mon-Fri", tz),
            Self::new("weekday-evening", "0 17 * * Mon-Fri", tz),
            Self::new("weekend", "0 14 * * Sat", tz),
        ]
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid trigger {name:?} with pattern {pattern:?}: {reason}")]
    InvalidTrigger {
        name: String,
        pattern: String,
        reason: String,
    },
}

/// Parse a cron pattern, prepending a zero seconds field to five-field input.
///
/// Five-field patterns use the usual day-of-week numbering (0 or 7 = Sunday);
/// numeric days are rewritten to names before handing off to `cron`.
pub fn parse_cron(pattern: &str) -> Result<Schedule, cron::error::Error> {
    let fields = pattern.split_whitespace().collect::<Vec<_>>();
    if fields.len() == 5 {
        let six_field = format!(
            "0 {} {} {} {} {}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            standard_day_of_week(fields[4])
        );
        Schedule::from_str(&six_field)
    } else {
        Schedule::from_str(pattern)
    }
}

fn standard_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(|part| {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (part, None),
            };
            let range = range.split('-').map(day_name).collect::<Vec<_>>().join("-");
            match step {
                Some(step) => format!("{range}/{step}"),
                None => range,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn day_name(token: &str) -> &str {
    match token {
        "0" | "7" => "Sun",
        "1" => "Mon",
        "2" => "Tue",
        "3" => "Wed",
        "4" => "Thu",
        "5" => "Fri",
        "6" => "Sat",
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerKind {
    Ingest,
    Maintenance,
}

#[derive(Debug, Clone)]
struct Trigger {
    spec: TriggerSpec,
    schedule: Schedule,
    kind: TriggerKind,
}

impl Trigger {
    fn compile(spec: &TriggerSpec, kind: TriggerKind) -> Result<Self, SchedulerError> {
        let schedule = parse_cron(&spec.pattern).map_err(|e| SchedulerError::InvalidTrigger {
            name: spec.name.clone(),
            pattern: spec.pattern.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            spec: spec.clone(),
            schedule,
            kind,
        })
    }

    fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        self.schedule.after(&now.with_timezone(&self.spec.tz)).next()
    }
}

/// Earliest next fire instant across `triggers`, in the winning trigger's zone.
pub fn next_trigger_time(
    triggers: &[TriggerSpec],
    now: DateTime<Utc>,
) -> Result<Option<DateTime<FixedOffset>>, SchedulerError> {
    let mut earliest = None;
    for spec in triggers {
        let next = Trigger::compile(spec, TriggerKind::Ingest)?.next_after(now);
        earliest = match (earliest, next) {
            (Some(a), Some(b)) => Some(if b < a { b } else { a }),
            (a, b) => a.or(b),
        };
    }
    Ok(earliest)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerInfo {
    pub name: String,
    pub pattern: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub active_trigger_count: usize,
    pub next_trigger_time: Option<DateTime<FixedOffset>>,
    pub triggers: Vec<TriggerInfo>,
    pub retention_cleanup: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub result: Option<RunResult>,
    /// Set only when the run could not complete (store unreachable).
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn is_fatal(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum RunAttempt {
    /// Another run held the guard; nothing was executed.
    Skipped,
    Completed(RunOutcome),
}

pub struct SchedulerConfig {
    pub triggers: Vec<TriggerSpec>,
    pub tz: FixedOffset,
    /// Delay before the one-off boot run; `None` disables it.
    pub boot_delay: Option<Duration>,
    /// Daily retention cleanup, outside the ingestion trigger set.
    pub maintenance: Option<Maintenance>,
}

#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

struct Shared {
    pipeline: Arc<IngestPipeline>,
    maintenance: Option<Maintenance>,
    initial_triggers: Vec<TriggerSpec>,
    tz: FixedOffset,
    boot_delay: Option<Duration>,
    running: AtomicBool,
    booted: AtomicBool,
    generation: AtomicU64,
    triggers: RwLock<Vec<Trigger>>,
    last_outcome: Mutex<Option<RunOutcome>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    boot: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the running flag; clearing happens on drop, including during unwinding.
struct RunningGuard {
    shared: Arc<Shared>,
}

impl RunningGuard {
    fn acquire(shared: &Arc<Shared>) -> Option<Self> {
        shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                shared: shared.clone(),
            })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
    }
}

impl Shared {
    async fn run_pipeline(&self, label: String, started_at: DateTime<Utc>) -> RunOutcome {
        let label = label.as_str();
        info!(label, "ingestion run started");
        let clock = Instant::now();
        let result = self.pipeline.run_once().await;
        let duration_ms = i64::try_from(clock.elapsed().as_millis()).unwrap_or(i64::MAX);

        let outcome = match result {
            Ok(result) => {
                info!(
                    label,
                    duration_ms,
                    total_new = result.summary.total_new,
                    total_processed = result.summary.total_processed,
                    failed_sources = result.errors.len(),
                    "ingestion run completed"
                );
                for failure in &result.errors {
                    warn!(label, source_id = %failure.source_id, error = %failure.error, "source failed during run");
                }
                RunOutcome {
                    label: label.to_string(),
                    started_at,
                    finished_at: Utc::now(),
                    duration_ms,
                    result: Some(result),
                    error: None,
                }
            }
            Err(err) => {
                error!(label, duration_ms, error = %err, "ingestion run failed");
                RunOutcome {
                    label: label.to_string(),
                    started_at,
                    finished_at: Utc::now(),
                    duration_ms,
                    result: None,
                    error: Some(err.to_string()),
                }
            }
        };

        *lock(&self.last_outcome) = Some(outcome.clone());
        outcome
    }
}

impl Scheduler {
    pub fn new(pipeline: Arc<IngestPipeline>, config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                pipeline,
                maintenance: config.maintenance,
                initial_triggers: config.triggers,
                tz: config.tz,
                boot_delay: config.boot_delay,
                running: AtomicBool::new(false),
                booted: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                triggers: RwLock::new(Vec::new()),
                last_outcome: Mutex::new(None),
                timer: Mutex::new(None),
                boot: Mutex::new(None),
            }),
        }
    }

    /// Validate and install the configured triggers, start the timer loop and
    /// schedule the boot run. Any invalid pattern aborts before anything starts.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let triggers = self.compile(&self.shared.initial_triggers)?;
        self.install(triggers);

        if let Some(delay) = self.shared.boot_delay {
            if !self.shared.booted.swap(true, Ordering::AcqRel) {
                let scheduler = self.clone();
                // Only the pending delay is abortable; the run itself is detached.
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    scheduler.fire("boot".to_string(), TriggerKind::Ingest);
                });
                *lock(&self.shared.boot) = Some(handle);
                info!(delay_secs = delay.as_secs_f64(), "boot run scheduled");
            }
        }
        Ok(())
    }

    /// Replace the whole trigger set. On error the current set stays active.
    pub fn restart(&self, triggers: Vec<TriggerSpec>) -> Result<(), SchedulerError> {
        let compiled = self.compile(&triggers)?;
        self.install(compiled);
        Ok(())
    }

    /// Drop all future triggers. A run already in flight finishes normally.
    pub fn stop(&self) {
        let mut timer = lock(&self.shared.timer);
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        if let Some(handle) = lock(&self.shared.boot).take() {
            handle.abort();
        }
        write(&self.shared.triggers).clear();
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn last_outcome(&self) -> Option<RunOutcome> {
        lock(&self.shared.last_outcome).clone()
    }

    pub fn timezone(&self) -> FixedOffset {
        self.shared.tz
    }

    pub fn status(&self, now: DateTime<Utc>) -> SchedulerStatus {
        let triggers = read(&self.shared.triggers);
        let ingest = triggers
            .iter()
            .filter(|t| t.kind == TriggerKind::Ingest)
            .collect::<Vec<_>>();
        SchedulerStatus {
            is_running: self.is_running(),
            active_trigger_count: ingest.len(),
            next_trigger_time: ingest.iter().filter_map(|t| t.next_after(now)).min(),
            triggers: ingest
                .iter()
                .map(|t| TriggerInfo {
                    name: t.spec.name.clone(),
                    pattern: t.spec.pattern.clone(),
                    timezone: t.spec.tz.to_string(),
                })
                .collect(),
            retention_cleanup: triggers.iter().any(|t| t.kind == TriggerKind::Maintenance),
        }
    }

    /// Run one ingestion pass unless another is already executing.
    ///
    /// The pass runs on its own task, so dropping the returned future (a
    /// disconnected HTTP caller, say) does not cancel it; the outcome is still
    /// recorded as [`Scheduler::last_outcome`].
    pub async fn execute_run(&self, label: &str) -> RunAttempt {
        let Some(guard) = RunningGuard::acquire(&self.shared) else {
            warn!(label, "run skipped: another run is already in progress");
            return RunAttempt::Skipped;
        };

        let shared = self.shared.clone();
        let owned_label = label.to_string();
        let started_at = Utc::now();
        let task = tokio::spawn(async move {
            let _guard = guard;
            shared.run_pipeline(owned_label, started_at).await
        });

        match task.await {
            Ok(outcome) => RunAttempt::Completed(outcome),
            Err(err) => {
                error!(label, error = %err, "ingestion run task aborted");
                let outcome = RunOutcome {
                    label: label.to_string(),
                    started_at,
                    finished_at: Utc::now(),
                    duration_ms: (Utc::now() - started_at).num_milliseconds(),
                    result: None,
                    error: Some(format!("run task aborted: {err}")),
                };
                *lock(&self.shared.last_outcome) = Some(outcome.clone());
                RunAttempt::Completed(outcome)
            }
        }
    }

    fn compile(&self, specs: &[TriggerSpec]) -> Result<Vec<Trigger>, SchedulerError> {
        let mut compiled = specs
            .iter()
            .map(|spec| Trigger::compile(spec, TriggerKind::Ingest))
            .collect::<Result<Vec<_>, _>>()?;
        if self.shared.maintenance.is_some() {
            let spec = TriggerSpec::new("retention-cleanup", MAINTENANCE_PATTERN, self.shared.tz);
            compiled.push(Trigger::compile(&spec, TriggerKind::Maintenance)?);
        }
        Ok(compiled)
    }

    fn install(&self, triggers: Vec<Trigger>) {
        let mut timer = lock(&self.shared.timer);
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(old) = timer.take() {
            old.abort();
        }
        for trigger in &triggers {
            info!(name = %trigger.spec.name, pattern = %trigger.spec.pattern, tz = %trigger.spec.tz, "trigger active");
        }
        *write(&self.shared.triggers) = triggers;
        *timer = Some(tokio::spawn(self.clone().run_timer(generation)));
    }

    async fn run_timer(self, generation: u64) {
        let mut cursor = Utc::now();
        loop {
            let Some((fire_at, due)) = self.due_after(Utc::now().max(cursor)) else {
                debug!("no active triggers; timer loop idle");
                return;
            };
            let wait = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            debug!(next = %fire_at, wait_secs = wait.as_secs(), "timer sleeping");
            tokio::time::sleep(wait).await;

            if self.shared.generation.load(Ordering::Acquire) != generation {
                return;
            }
            for (name, kind) in due {
                self.fire(name, kind);
            }
            cursor = fire_at;
        }
    }

    fn due_after(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Vec<(String, TriggerKind)>)> {
        let triggers = read(&self.shared.triggers);
        let upcoming = triggers
            .iter()
            .filter_map(|t| t.next_after(now).map(|at| (at.with_timezone(&Utc), t)))
            .collect::<Vec<_>>();
        let earliest = upcoming.iter().map(|(at, _)| *at).min()?;
        let due = upcoming
            .into_iter()
            .filter(|(at, _)| *at == earliest)
            .map(|(_, t)| (t.spec.name.clone(), t.kind))
            .collect();
        Some((earliest, due))
    }

    fn fire(&self, name: String, kind: TriggerKind) {
        match kind {
            TriggerKind::Ingest => {
                let scheduler = self.clone();
                tokio::spawn(async move {
                    scheduler.execute_run(&name).await;
                });
            }
            TriggerKind::Maintenance => {
                if let Some(maintenance) = self.shared.maintenance.clone() {
                    tokio::spawn(async move {
                        if let Err(err) = maintenance.cleanup(Utc::now()).await {
                            error!(trigger = %name, error = %err, "retention cleanup failed");
                        }
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{candidate, kst, pipeline, temp_store, Script, ScriptedAdapter};
    use chrono::TimeZone;
    use govwire_storage::{RecordFilter, RecordStore};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        kst().with_ymd_and_hms(2026, 3, d, h, m, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn local(d: u32, h: u32) -> DateTime<FixedOffset> {
        kst().with_ymd_and_hms(2026, 3, d, h, 0, 0).single().unwrap()
    }

    fn config(triggers: Vec<TriggerSpec>) -> SchedulerConfig {
        SchedulerConfig {
            triggers,
            tz: kst(),
            boot_delay: None,
            maintenance: None,
        }
    }

    async fn wait_for_outcome(scheduler: &Scheduler, label: &str) -> Option<RunOutcome> {
        for _ in 0..60 {
            if let Some(outcome) = scheduler.last_outcome().filter(|o| o.label == label) {
                return Some(outcome);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        None
    }

    // 2026-03-02 is a Monday.
    #[test]
    fn next_trigger_is_later_the_same_day() {
        let next = next_trigger_time(&TriggerSpec::defaults(kst()), at(2, 14, 0)).unwrap();
        assert_eq!(next, Some(local(2, 17)));
    }

    #[test]
    fn next_trigger_falls_through_to_the_next_scheduled_day() {
        let defaults = TriggerSpec::defaults(kst());
        assert_eq!(next_trigger_time(&defaults, at(2, 18, 0)).unwrap(), Some(local(3, 9)));
        assert_eq!(next_trigger_time(&defaults, at(6, 18, 0)).unwrap(), Some(local(7, 14)));
        assert_eq!(next_trigger_time(&defaults, at(7, 15, 0)).unwrap(), Some(local(9, 9)));
    }

    #[test]
    fn a_trigger_instant_itself_is_not_next() {
        let next = next_trigger_time(&TriggerSpec::defaults(kst()), at(2, 9, 0)).unwrap();
        assert_eq!(next, Some(local(2, 13)));
    }

    #[test]
    fn numeric_weekdays_follow_the_usual_cron_convention() {
        let numeric = vec![
            TriggerSpec::new("weekday", "0 9 * * 1-5", kst()),
            TriggerSpec::new("saturday", "0 14 * * 6", kst()),
        ];
        // Sunday morning: next is Monday, not Sunday.
        assert_eq!(next_trigger_time(&numeric, at(1, 8, 0)).unwrap(), Some(local(2, 9)));
        assert_eq!(next_trigger_time(&numeric, at(6, 10, 0)).unwrap(), Some(local(7, 14)));
        assert_eq!(standard_day_of_week("0,3-5/2"), "Sun,Wed-Fri/2");
        assert_eq!(standard_day_of_week("*"), "*");
    }

    #[tokio::test]
    async fn invalid_pattern_prevents_start() {
        let (_dir, store) = temp_store().await;
        let pipeline = Arc::new(pipeline(store, ScriptedAdapter::default(), &[]));
        let scheduler = Scheduler::new(
            pipeline,
            config(vec![
                TriggerSpec::new("ok", "0 9 * * Mon-Fri", kst()),
                TriggerSpec::new("bad", "every morning", kst()),
            ]),
        );

        let err = scheduler.start().expect_err("invalid pattern");
        let SchedulerError::InvalidTrigger { name, .. } = err;
        assert_eq!(name, "bad");
        let status = scheduler.status(Utc::now());
        assert_eq!(status.active_trigger_count, 0);
        assert_eq!(status.next_trigger_time, None);
    }

    #[tokio::test]
    async fn overlapping_runs_are_skipped() {
        let (_dir, store) = temp_store().await;
        let adapter = ScriptedAdapter::default().with(
            "fsc",
            Script::Slow(Duration::from_millis(300), vec![candidate("slow")]),
        );
        let scheduler = Scheduler::new(Arc::new(pipeline(store, adapter, &["fsc"])), config(vec![]));

        let (a, b) = tokio::join!(scheduler.execute_run("first"), scheduler.execute_run("second"));

        assert!(matches!(a, RunAttempt::Completed(_)));
        assert!(matches!(b, RunAttempt::Skipped));
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.last_outcome().unwrap().label, "first");
    }

    #[tokio::test]
    async fn dropped_caller_does_not_cancel_the_run() {
        let (_dir, store) = temp_store().await;
        let slow = |title: &str| Script::Slow(Duration::from_millis(150), vec![candidate(title)]);
        let adapter = ScriptedAdapter::default()
            .with("fsc", slow("one"))
            .with("fss", slow("two"))
            .with("ftc", slow("three"));
        let scheduler = Scheduler::new(
            Arc::new(pipeline(store.clone(), adapter, &["fsc", "fss", "ftc"])),
            config(vec![]),
        );

        let caller = tokio::time::timeout(Duration::from_millis(200), scheduler.execute_run("manual")).await;
        assert!(caller.is_err());

        let outcome = wait_for_outcome(&scheduler, "manual").await.expect("run completed");
        assert_eq!(outcome.result.unwrap().summary.total_new, 3);
        assert_eq!(store.count(&RecordFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn stop_leaves_an_in_flight_boot_run_alone() {
        let (_dir, store) = temp_store().await;
        let adapter = ScriptedAdapter::default()
            .with("fsc", Script::Slow(Duration::from_millis(200), vec![candidate("a")]))
            .with("fss", Script::Slow(Duration::from_millis(200), vec![candidate("b")]));
        let scheduler = Scheduler::new(
            Arc::new(pipeline(store.clone(), adapter, &["fsc", "fss"])),
            SchedulerConfig {
                boot_delay: Some(Duration::from_millis(10)),
                ..config(vec![])
            },
        );

        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(scheduler.is_running());
        scheduler.stop();

        let outcome = wait_for_outcome(&scheduler, "boot").await.expect("boot run finished");
        assert_eq!(outcome.result.unwrap().success.len(), 2);
        assert_eq!(store.count(&RecordFilter::default()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn fatal_run_clears_the_guard() {
        let (_dir, store) = temp_store().await;
        let adapter = ScriptedAdapter::default().items("fsc", &["a"]);
        let scheduler = Scheduler::new(
            Arc::new(pipeline(store.clone(), adapter, &["fsc"])),
            config(vec![]),
        );
        store.close().await;

        let RunAttempt::Completed(first) = scheduler.execute_run("manual").await else {
            panic!("first run should execute");
        };
        assert!(first.is_fatal());
        assert!(first.result.is_none());
        assert!(!scheduler.is_running());
        assert!(matches!(scheduler.execute_run("again").await, RunAttempt::Completed(_)));
    }

    #[tokio::test]
    async fn restart_replaces_the_trigger_set() {
        let (_dir, store) = temp_store().await;
        let scheduler = Scheduler::new(
            Arc::new(pipeline(store, ScriptedAdapter::default(), &[])),
            config(TriggerSpec::defaults(kst())),
        );
        scheduler.start().unwrap();
        assert_eq!(scheduler.status(at(2, 14, 0)).active_trigger_count, 4);

        scheduler
            .restart(vec![TriggerSpec::new("noon", "0 12 * * *", kst())])
            .unwrap();
        let status = scheduler.status(at(2, 14, 0));
        assert_eq!(status.active_trigger_count, 1);
        assert_eq!(status.triggers[0].name, "noon");
        assert_eq!(status.triggers[0].timezone, "+09:00");
        assert_eq!(status.next_trigger_time, Some(local(3, 12)));

        assert!(scheduler
            .restart(vec![TriggerSpec::new("broken", "61 * * * *", kst())])
            .is_err());
        assert_eq!(scheduler.status(at(2, 14, 0)).triggers[0].name, "noon");

        scheduler.stop();
        let stopped = scheduler.status(at(2, 14, 0));
        assert_eq!(stopped.active_trigger_count, 0);
        assert_eq!(stopped.next_trigger_time, None);
    }

    #[tokio::test]
    async fn timer_loop_fires_due_triggers() {
        let (_dir, store) = temp_store().await;
        let adapter = ScriptedAdapter::default().items("fss", &["tick"]);
        let scheduler = Scheduler::new(
            Arc::new(pipeline(store, adapter, &["fss"])),
            config(vec![TriggerSpec::new("every-second", "* * * * * *", kst())]),
        );
        scheduler.start().unwrap();

        let outcome = wait_for_outcome(&scheduler, "every-second").await;
        scheduler.stop();

        let outcome = outcome.expect("trigger fired");
        assert_eq!(outcome.result.unwrap().success[0].source_id, "fss");
    }

    #[tokio::test]
    async fn boot_run_happens_once() {
        let (_dir, store) = temp_store().await;
        let adapter = ScriptedAdapter::default().items("ftc", &["boot item"]);
        let calls = adapter.calls.clone();
        let scheduler = Scheduler::new(
            Arc::new(pipeline(store, adapter, &["ftc"])),
            SchedulerConfig {
                boot_delay: Some(Duration::from_millis(20)),
                ..config(vec![])
            },
        );

        scheduler.start().unwrap();
        assert!(wait_for_outcome(&scheduler, "boot").await.is_some());
        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn maintenance_trigger_is_not_an_ingestion_trigger() {
        let (_dir, store) = temp_store().await;
        let maintenance = Maintenance::new(store.clone(), 30);
        let scheduler = Scheduler::new(
            Arc::new(pipeline(store, ScriptedAdapter::default(), &[])),
            SchedulerConfig {
                maintenance: Some(maintenance),
                ..config(TriggerSpec::defaults(kst()))
            },
        );
        scheduler.start().unwrap();

        let status = scheduler.status(at(2, 18, 0));
        assert_eq!(status.active_trigger_count, 4);
        assert!(status.retention_cleanup);
        assert_eq!(status.next_trigger_time, Some(local(3, 9)));
        scheduler.stop();
    }
}
