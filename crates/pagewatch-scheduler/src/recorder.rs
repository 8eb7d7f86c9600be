//! Change detector & recorder — the only writer of watch-task state.
//!
//! The fingerprint comparison always runs against the pre-update
//! snapshot: the very first successful execution counts as changed
//! relative to the absent prior hash, and a failure after a success
//! counts as changed too (present vs. absent).

use pagewatch_core::types::{ExecutionResult, LastExecution, WatchTask};

/// Compute `hash_changed` against the previous snapshot, then replace it
/// with the new one. Persistence is the scheduler's job, after dispatch
/// has been initiated.
pub fn apply(task: &mut WatchTask, result: &ExecutionResult) {
    let hash_changed = task.last_hash() != result.hash_target();
    task.last_execution = Some(LastExecution::from_result(result, hash_changed));
}
