//! Watch scheduler — one recurring timer per task.
//!
//! Every scheduled task owns a spawned loop holding the task record and
//! an interval at its own cadence. The first tick fires immediately, so
//! scheduling a task also runs it once. Cycles of one task are
//! serialized: the loop awaits each cycle before observing the next tick
//! (missed ticks are delayed, not bursted), so a slow fetch postpones
//! that task's next cycle without ever stacking two of them. Stop
//! signals are observed between cycles — cancellation takes effect at
//! the next tick and an in-flight cycle completes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{MissedTickBehavior, interval};

use pagewatch_channels::DispatcherSet;
use pagewatch_core::error::Result;
use pagewatch_core::traits::{ExecutionHistory, Fetcher, OwnerStore, TaskStore};
use pagewatch_core::types::{Owner, WatchTask};

use crate::{dispatch, policy, recorder, runner};

/// Cheaply cloneable handle to the scheduler; gateway routes hold one.
#[derive(Clone)]
pub struct WatchScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    store: Arc<dyn TaskStore>,
    owners: Arc<dyn OwnerStore>,
    history: Arc<dyn ExecutionHistory>,
    fetcher: Arc<dyn Fetcher>,
    dispatchers: Arc<DispatcherSet>,
    timers: Mutex<HashMap<i64, TimerHandle>>,
}

struct TimerHandle {
    stop: Arc<Notify>,
    cadence_minutes: u32,
}

impl WatchScheduler {
    pub fn new(
        store: Arc<dyn TaskStore>,
        owners: Arc<dyn OwnerStore>,
        history: Arc<dyn ExecutionHistory>,
        fetcher: Arc<dyn Fetcher>,
        dispatchers: Arc<DispatcherSet>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                owners,
                history,
                fetcher,
                dispatchers,
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Load all eligible tasks and register a timer for each. A load
    /// failure is logged and leaves the scheduler running with zero
    /// tasks — the rest of the process stays healthy.
    pub fn start(&self) {
        let tasks = match self.inner.store.load_eligible() {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!("task load failed, scheduler starting idle: {e}");
                return;
            }
        };

        tracing::info!("starting {} watch timer(s)", tasks.len());
        for task in tasks {
            self.schedule(task);
        }
    }

    /// Register a recurring timer for one task, running the first cycle
    /// immediately. Returns false if the task is a dependency or already
    /// has a timer — a task never has two.
    pub fn schedule(&self, task: WatchTask) -> bool {
        if task.options.is_dependency {
            tracing::debug!("task {} is a dependency, not scheduling", task.id);
            return false;
        }

        let cadence = task.options.cadence_minutes.max(1);
        let stop = Arc::new(Notify::new());
        {
            let mut timers = self.inner.timers.lock().unwrap();
            if timers.contains_key(&task.id) {
                tracing::warn!("task {} already has a timer, skipping", task.id);
                return false;
            }
            timers.insert(
                task.id,
                TimerHandle {
                    stop: stop.clone(),
                    cadence_minutes: cadence,
                },
            );
        }

        tracing::info!(
            "watching {} every {cadence} minute(s) (task {})",
            task.url,
            task.id
        );

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut task = task;
            let mut ticker = interval(Duration::from_secs(u64::from(cadence) * 60));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => run_cycle(&inner, &mut task).await,
                    _ = stop.notified() => {
                        tracing::info!("watch timer for task {} stopped", task.id);
                        break;
                    }
                }
            }
        });
        true
    }

    /// Remove a task's timer. The in-flight cycle, if any, completes.
    pub fn cancel(&self, task_id: i64) -> bool {
        let handle = self.inner.timers.lock().unwrap().remove(&task_id);
        match handle {
            Some(handle) => {
                handle.stop.notify_one();
                true
            }
            None => false,
        }
    }

    /// Replace a task's timer with one at a new cadence, persisting the
    /// cadence change.
    pub fn reschedule(&self, task_id: i64, cadence_minutes: u32) -> Result<bool> {
        self.cancel(task_id);
        let Some(mut task) = self.inner.store.get(task_id)? else {
            return Ok(false);
        };
        task.options.cadence_minutes = cadence_minutes.max(1);
        if let Err(e) = self.inner.store.save(&task) {
            tracing::warn!("failed to persist new cadence for task {task_id}: {e}");
        }
        Ok(self.schedule(task))
    }

    /// Number of tasks with an active timer.
    pub fn active_count(&self) -> usize {
        self.inner.timers.lock().unwrap().len()
    }

    /// Cadence of a task's active timer, if it has one.
    pub fn cadence_of(&self, task_id: i64) -> Option<u32> {
        self.inner
            .timers
            .lock()
            .unwrap()
            .get(&task_id)
            .map(|h| h.cadence_minutes)
    }
}

/// One complete cycle: fetch, record, decide, fan out, persist. Every
/// step handles its own failure; nothing escapes to the timer loop.
async fn run_cycle(inner: &SchedulerInner, task: &mut WatchTask) {
    tracing::debug!("cycle started for {} (task {})", task.url, task.id);

    let result = runner::run(inner.fetcher.as_ref(), task).await;

    let execution_id = match inner.history.record(&task.url, &result) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!("failed to record execution of {}: {e}", task.url);
            None
        }
    };

    recorder::apply(task, &result);

    let owner = resolve_owner(inner, task);
    match policy::should_notify(task, &result, inner.history.as_ref(), owner.as_ref(), execution_id)
    {
        Ok(()) => {
            // Fire-and-forget: initiated here, confirmed never.
            let _ = dispatch::notify(task, owner.as_ref(), &inner.dispatchers);
        }
        Err(skip) => tracing::info!("notification for {} skipped: {skip}", task.url),
    }

    // Persisted exactly once per cycle, after dispatch initiation,
    // whether or not anything was sent.
    if let Err(e) = inner.store.save(task) {
        tracing::error!("failed to persist task {}: {e}", task.id);
    }
}

fn resolve_owner(inner: &SchedulerInner, task: &WatchTask) -> Option<Owner> {
    let owner_id = task.owner_id?;
    match inner.owners.owner(owner_id) {
        Ok(owner) => owner,
        Err(e) => {
            tracing::warn!("owner lookup {owner_id} for task {} failed: {e}", task.id);
            None
        }
    }
}
