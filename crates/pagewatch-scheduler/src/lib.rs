//! # Pagewatch Scheduler
//! The recurring execution & notification pipeline.
//!
//! One tokio timer task per watch, each running the same cycle:
//!
//! ```text
//! WatchScheduler (one interval per task, task_id → stop handle)
//!   └── cycle: runner → recorder → policy → fan-out → persist
//!                          │          │        └── dispatchers (spawned,
//!                          │          │             failures logged only)
//!                          │          └── similarity filter + skip reasons
//!                          └── fingerprint diff against the prior snapshot
//! ```
//!
//! Nothing inside a cycle escapes to the timer loop as an error: every
//! step converts its own failures into a logged outcome, so one task can
//! never take down another task's timer.

pub mod dispatch;
pub mod engine;
pub mod persistence;
pub mod policy;
pub mod recorder;
pub mod runner;
pub mod similarity;
pub mod template;

#[cfg(test)]
mod testutil;

pub use engine::WatchScheduler;
pub use persistence::WatchDb;
pub use policy::SkipReason;

/// Resolve a task-level value with owner fallback: the task's own value
/// if usable, else the owner's if usable, else none. Shared by the
/// notification-list and word-filter lookups so the two fallback rules
/// cannot drift apart.
pub fn effective<'a, T: ?Sized>(
    own: Option<&'a T>,
    fallback: Option<&'a T>,
    usable: fn(&T) -> bool,
) -> Option<&'a T> {
    own.filter(|v| usable(v))
        .or_else(|| fallback.filter(|v| usable(v)))
}
