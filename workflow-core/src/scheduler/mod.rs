//! Calendar-based recurring execution of workitem-producing jobs (spec
//! §4.5). The scheduler owns at most one live timer per configuration id
//! and dispatches firings to a caller-supplied [`SchedulerJob`] resolved
//! by name from a registration table rather than by reflection (spec §9
//! "Reflection-based plugin lookup by class-name").

pub mod calendar;

pub use calendar::CalendarExpression;

use crate::error::{SchedulerErrorCode, WorkflowError};
use crate::item::{ItemCollection, Value, ITEM_UNIQUEID};
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// At most this many schedulers are started concurrently by
/// `start_all_schedulers` (spec §4.5).
pub const MAX_ACTIVE_SCHEDULERS: usize = 100;

pub const ITEM_SCHEDULER_TYPE: &str = "type";
pub const SCHEDULER_DOC_TYPE: &str = "scheduler";
pub const ITEM_SCHEDULER_NAME: &str = "txtname";
pub const ITEM_SCHEDULER_CALENDAR: &str = "txtcalendar";
pub const ITEM_SCHEDULER_IMPLEMENTATION: &str = "txtschedulerclass";
pub const ITEM_SCHEDULER_ENABLED: &str = "enabled";
pub const ITEM_SCHEDULER_LOG: &str = "txtlog";
pub const ITEM_SCHEDULER_ERROR: &str = "txterror";
pub const ITEM_SCHEDULER_NEXT_TIMEOUT: &str = "datnexttimeout";
pub const ITEM_SCHEDULER_TIME_REMAINING: &str = "numtimeremaining";

/// Typed accessors onto the reserved `type = "scheduler"` document (spec
/// §3.3), following the same extension-trait shape as
/// [`crate::item::FileAttachments`] rather than a standalone struct — the
/// scheduler configuration is, underneath, an ordinary `ItemCollection`
/// that the document store persists like any other workitem.
pub trait SchedulerConfig {
    fn scheduler_id(&self) -> String;
    fn scheduler_name(&self) -> String;
    fn calendar_expression(&self) -> CalendarExpression;
    fn implementation(&self) -> String;
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
    fn append_log(&mut self, line: String);
    fn set_error(&mut self, message: String);
    fn next_timeout(&self) -> Option<DateTime<Utc>>;
    fn set_next_timeout(&mut self, next: Option<DateTime<Utc>>);
    fn set_time_remaining(&mut self, seconds: i64);
    fn mark_as_scheduler(&mut self, id: impl Into<String>, name: impl Into<String>, calendar: impl Into<String>, implementation: impl Into<String>);
}

impl SchedulerConfig for ItemCollection {
    fn scheduler_id(&self) -> String {
        self.get_item_value_string(ITEM_UNIQUEID)
    }

    fn scheduler_name(&self) -> String {
        self.get_item_value_string(ITEM_SCHEDULER_NAME)
    }

    fn calendar_expression(&self) -> CalendarExpression {
        CalendarExpression::parse(&self.get_item_value_string(ITEM_SCHEDULER_CALENDAR))
    }

    fn implementation(&self) -> String {
        self.get_item_value_string(ITEM_SCHEDULER_IMPLEMENTATION)
    }

    fn enabled(&self) -> bool {
        self.get_item_value_bool(ITEM_SCHEDULER_ENABLED)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.set_item_value(ITEM_SCHEDULER_ENABLED, Value::Bool(enabled));
    }

    fn append_log(&mut self, line: String) {
        self.append_item_value(ITEM_SCHEDULER_LOG, Value::Str(line));
    }

    fn set_error(&mut self, message: String) {
        self.set_item_value(ITEM_SCHEDULER_ERROR, Value::Str(message));
    }

    fn next_timeout(&self) -> Option<DateTime<Utc>> {
        self.get_item_value(ITEM_SCHEDULER_NEXT_TIMEOUT)
            .into_iter()
            .next()
            .and_then(|v| v.as_instant())
    }

    fn set_next_timeout(&mut self, next: Option<DateTime<Utc>>) {
        match next {
            Some(instant) => self.set_item_value(ITEM_SCHEDULER_NEXT_TIMEOUT, Value::Instant(instant)),
            None => self.remove_item(ITEM_SCHEDULER_NEXT_TIMEOUT),
        }
    }

    fn set_time_remaining(&mut self, seconds: i64) {
        self.set_item_value(ITEM_SCHEDULER_TIME_REMAINING, Value::I64(seconds));
    }

    fn mark_as_scheduler(&mut self, id: impl Into<String>, name: impl Into<String>, calendar: impl Into<String>, implementation: impl Into<String>) {
        self.set_item_value(ITEM_UNIQUEID, Value::Str(id.into()));
        self.set_item_value(ITEM_SCHEDULER_TYPE, Value::Str(SCHEDULER_DOC_TYPE.to_string()));
        self.set_item_value(ITEM_SCHEDULER_NAME, Value::Str(name.into()));
        self.set_item_value(ITEM_SCHEDULER_CALENDAR, Value::Str(calendar.into()));
        self.set_item_value(ITEM_SCHEDULER_IMPLEMENTATION, Value::Str(implementation.into()));
        self.set_item_value(ITEM_SCHEDULER_ENABLED, Value::Bool(false));
    }
}

/// The caller-supplied implementation contract (spec §6.3). Any error —
/// whether a deliberate `SchedulerError` or an incidental runtime fault —
/// is fatal to the firing and stops the timer (spec §4.5, §7).
pub trait SchedulerJob: Send + Sync {
    fn run(&self, config: ItemCollection) -> Result<ItemCollection, WorkflowError>;
}

/// Result of dispatching one firing (spec §4.5 `onTimeout`, §9 "replace
/// the nested try/catch cascade with a single result-returning dispatch").
/// `Continue` is part of the tri-state shape DESIGN NOTES §9 calls for but
/// is never produced by `on_timeout` today — every observed failure mode
/// in spec §4.5's body stops the timer; see DESIGN.md.
pub enum TimeoutDisposition {
    Ok(ItemCollection),
    Stop(WorkflowError),
    Continue(WorkflowError),
}

struct TimerHandle {
    next_timeout: Option<DateTime<Utc>>,
}

/// Owns the live-timer registry and the name-keyed job table (spec §4.5,
/// §9). The document store is the scheduler's only persistence
/// collaborator — configurations are ordinary documents.
pub struct Scheduler {
    store: Arc<dyn DocumentStore>,
    jobs: BTreeMap<String, Arc<dyn SchedulerJob>>,
    timers: RwLock<BTreeMap<String, TimerHandle>>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            jobs: BTreeMap::new(),
            timers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a `SchedulerJob` implementation under the name BPMN
    /// configurations reference via `txtschedulerclass` (spec §9: "a
    /// registration table keyed by plugin *name*").
    pub fn register_job(&mut self, name: impl Into<String>, job: Arc<dyn SchedulerJob>) {
        self.jobs.insert(name.into(), job);
    }

    /// Cancels any existing timer for `config`'s id, computes the next
    /// firing from its calendar expression, and registers a fresh timer
    /// (spec §4.5 `start`).
    pub async fn start(&self, mut config: ItemCollection) -> Result<ItemCollection, WorkflowError> {
        let id = config.scheduler_id();
        self.cancel_timer(&id).await;

        let expr = config.calendar_expression();
        let next = expr.next_timeout_after(Utc::now()).ok_or_else(|| {
            WorkflowError::scheduler(
                SchedulerErrorCode::InvalidCalendarExpression,
                format!("calendar expression for '{id}' has no recognized repeating field"),
            )
        })?;

        config.set_enabled(true);
        config.set_next_timeout(Some(next));
        config.append_log(format!("Started: {}", Utc::now().to_rfc3339()));

        self.timers.write().await.insert(id, TimerHandle { next_timeout: Some(next) });
        Ok(config)
    }

    /// Cancels the timer if present, clears derived timing fields, and
    /// marks the configuration disabled (spec §4.5 `stop`).
    pub async fn stop(&self, mut config: ItemCollection) -> Result<ItemCollection, WorkflowError> {
        let id = config.scheduler_id();
        self.cancel_timer(&id).await;
        config.set_enabled(false);
        config.set_next_timeout(None);
        config.set_time_remaining(0);
        config.append_log(format!("Stopped: {}", Utc::now().to_rfc3339()));
        Ok(config)
    }

    async fn cancel_timer(&self, id: &str) {
        self.timers.write().await.remove(id);
    }

    /// `None` once `stop` has run; `Some` after `start`, satisfying spec
    /// §8 invariant 8 (two successive `start` calls leave exactly one
    /// timer — `start` always cancels-then-inserts under the same id).
    pub async fn find_timer(&self, id: &str) -> Option<DateTime<Utc>> {
        self.timers.read().await.get(id).and_then(|h| h.next_timeout)
    }

    /// Refreshes `nextTimeout`/`timeRemaining` display items from the live
    /// timer registry (spec §4.5 `updateTimerDetails`).
    pub async fn update_timer_details(&self, config: &mut ItemCollection) {
        let id = config.scheduler_id();
        match self.find_timer(&id).await {
            Some(next) => {
                config.set_next_timeout(Some(next));
                config.set_time_remaining((next - Utc::now()).num_seconds().max(0));
            }
            None => {
                config.set_next_timeout(None);
                config.set_time_remaining(0);
            }
        }
    }

    /// Scans persisted scheduler documents at process start and starts
    /// every enabled one without a live timer, capped at
    /// `MAX_ACTIVE_SCHEDULERS` (spec §4.5).
    pub async fn start_all_schedulers(&self) -> Result<usize, WorkflowError> {
        let docs = self
            .store
            .get_documents_by_type(SCHEDULER_DOC_TYPE)
            .await
            .map_err(|e| WorkflowError::scheduler(SchedulerErrorCode::StorageFailure, e.to_string()))?;

        let mut started = 0usize;
        for doc in docs {
            if started >= MAX_ACTIVE_SCHEDULERS {
                tracing::warn!(cap = MAX_ACTIVE_SCHEDULERS, "scheduler cap reached, remaining configs left stopped");
                break;
            }
            if !doc.enabled() {
                continue;
            }
            let id = doc.scheduler_id();
            if self.find_timer(&id).await.is_some() {
                continue;
            }
            let started_config = self.start(doc).await?;
            self.store
                .save(started_config)
                .await
                .map_err(|e| WorkflowError::scheduler(SchedulerErrorCode::StorageFailure, e.to_string()))?;
            started += 1;
        }
        Ok(started)
    }

    /// One firing (spec §4.5 `onTimeout`): load the config by id, resolve
    /// the registered implementation, run it, persist the result under a
    /// fresh transaction, and record `Finished`/`Error` on the log.
    pub async fn on_timeout(&self, config_id: &str) -> TimeoutDisposition {
        let config = match self.store.load(config_id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                self.cancel_timer(config_id).await;
                return TimeoutDisposition::Stop(WorkflowError::scheduler(
                    SchedulerErrorCode::StorageFailure,
                    format!("scheduler config '{config_id}' no longer exists"),
                ));
            }
            Err(e) => {
                return TimeoutDisposition::Stop(WorkflowError::scheduler(
                    SchedulerErrorCode::StorageFailure,
                    e.to_string(),
                ))
            }
        };

        let implementation = config.implementation();
        let Some(job) = self.jobs.get(&implementation).cloned() else {
            self.cancel_timer(config_id).await;
            return TimeoutDisposition::Stop(WorkflowError::scheduler(
                SchedulerErrorCode::ImplementationNotFound,
                format!("no scheduler implementation registered for '{implementation}'"),
            ));
        };

        match job.run(config.clone()) {
            Ok(mut updated) => {
                updated.append_log(format!("Finished: {}", Utc::now().to_rfc3339()));
                match self.store.save(updated).await {
                    Ok(saved) => TimeoutDisposition::Ok(saved),
                    Err(e) => TimeoutDisposition::Stop(WorkflowError::scheduler(
                        SchedulerErrorCode::StorageFailure,
                        e.to_string(),
                    )),
                }
            }
            Err(err) => {
                let mut failed = config;
                failed.append_log(format!("Error: {err}"));
                failed.set_error(err.to_string());
                if let Err(save_err) = self.store.save(failed).await {
                    tracing::warn!(error = %save_err, "failed to persist scheduler error state");
                }
                self.cancel_timer(config_id).await;
                TimeoutDisposition::Stop(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;

    struct DemoJob;
    impl SchedulerJob for DemoJob {
        fn run(&self, mut config: ItemCollection) -> Result<ItemCollection, WorkflowError> {
            let runs = config.get_item_value_long("runs") + 1;
            config.set_item_value("runs", Value::I64(runs));
            Ok(config)
        }
    }

    struct FailingJob;
    impl SchedulerJob for FailingJob {
        fn run(&self, _config: ItemCollection) -> Result<ItemCollection, WorkflowError> {
            Err(WorkflowError::scheduler(SchedulerErrorCode::StorageFailure, "synthetic failure"))
        }
    }

    fn demo_config(id: &str) -> ItemCollection {
        let mut c = ItemCollection::new();
        c.mark_as_scheduler(id, "demo scheduler", "minute=*\nhour=*", "demo");
        c
    }

    // S6: scheduler firing.
    #[tokio::test]
    async fn start_then_timeout_runs_job_once_and_persists_with_finished_log() {
        let store = Arc::new(MemoryDocumentStore::new());
        let mut scheduler = Scheduler::new(store.clone());
        scheduler.register_job("demo", Arc::new(DemoJob));

        let config = demo_config("sched-1");
        let started = scheduler.start(config).await.unwrap();
        assert!(scheduler.find_timer("sched-1").await.is_some());
        store.save(started).await.unwrap();

        match scheduler.on_timeout("sched-1").await {
            TimeoutDisposition::Ok(saved) => {
                assert_eq!(saved.get_item_value_long("runs"), 1);
                let log = saved.get_item_value_string_list(ITEM_SCHEDULER_LOG);
                assert!(log.iter().any(|l| l.starts_with("Finished:")));
            }
            TimeoutDisposition::Stop(e) | TimeoutDisposition::Continue(e) => panic!("unexpected: {e}"),
        }
    }

    #[tokio::test]
    async fn start_twice_leaves_exactly_one_timer_and_stop_clears_it() {
        let store = Arc::new(MemoryDocumentStore::new());
        let scheduler = Scheduler::new(store);
        let config = demo_config("sched-2");

        let started = scheduler.start(config.clone()).await.unwrap();
        scheduler.start(started).await.unwrap();
        assert!(scheduler.find_timer("sched-2").await.is_some());

        let stopped = scheduler.stop(config).await.unwrap();
        assert!(scheduler.find_timer("sched-2").await.is_none());
        assert!(!stopped.enabled());
    }

    #[tokio::test]
    async fn failing_job_stops_timer_and_records_error() {
        let store = Arc::new(MemoryDocumentStore::new());
        let mut scheduler = Scheduler::new(store.clone());
        scheduler.register_job("demo", Arc::new(FailingJob));

        let config = demo_config("sched-3");
        let started = scheduler.start(config).await.unwrap();
        store.save(started).await.unwrap();

        match scheduler.on_timeout("sched-3").await {
            TimeoutDisposition::Stop(_) => {}
            _ => panic!("expected Stop on job failure"),
        }
        assert!(scheduler.find_timer("sched-3").await.is_none());
        let saved = store.load("sched-3").await.unwrap().unwrap();
        assert!(!saved.get_item_value_string(ITEM_SCHEDULER_ERROR).is_empty());
    }

    #[tokio::test]
    async fn unknown_implementation_stops_without_panicking() {
        let store = Arc::new(MemoryDocumentStore::new());
        let scheduler = Scheduler::new(store.clone());
        let config = demo_config("sched-4");
        let started = scheduler.start(config).await.unwrap();
        store.save(started).await.unwrap();

        match scheduler.on_timeout("sched-4").await {
            TimeoutDisposition::Stop(e) => assert!(matches!(e, WorkflowError::Scheduler { .. })),
            _ => panic!("expected Stop for unregistered implementation"),
        }
    }
}
