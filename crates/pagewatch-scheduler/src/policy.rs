//! Notification policy — decides whether a cycle's result warrants a
//! notification.
//!
//! Fixed early-exit order: execution success, change gate, uniqueness
//! gate, similarity gate. Every condition reads the current tick's
//! state; nothing is cached across ticks. A skip is informational, never
//! an error — the cycle proceeds to persistence either way.

use pagewatch_core::traits::ExecutionHistory;
use pagewatch_core::types::{ExecutionResult, Owner, WatchTask, WordFilter};

use crate::similarity;

/// Why a notification was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ExecutionFailed,
    HashNotChanged,
    HashNotUnique,
    NoSimilarity,
    HistoryUnavailable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::ExecutionFailed => "execution failed",
            Self::HashNotChanged => "hash not changed",
            Self::HashNotUnique => "hash not unique",
            Self::NoSimilarity => "no similarity with filters",
            Self::HistoryUnavailable => "execution history unavailable",
        };
        f.write_str(reason)
    }
}

/// Evaluate the policy chain for one cycle. Expects the recorder to have
/// already applied the result, so `task.last_execution` is the new
/// snapshot. `execution_id` identifies this cycle's history record, to
/// exclude it from the uniqueness count.
pub fn should_notify(
    task: &WatchTask,
    result: &ExecutionResult,
    history: &dyn ExecutionHistory,
    owner: Option<&Owner>,
    execution_id: Option<i64>,
) -> Result<(), SkipReason> {
    if !result.is_success() {
        return Err(SkipReason::ExecutionFailed);
    }

    if task.options.only_changed {
        let changed = task
            .last_execution
            .as_ref()
            .is_some_and(|last| last.hash_changed);
        if !changed {
            return Err(SkipReason::HashNotChanged);
        }
    }

    if task.options.only_unique {
        // Success is established above, so the hash is present.
        let hash = result.hash_target().unwrap_or_default();
        match history.count_by_hash(&task.url, hash, execution_id) {
            Ok(0) => {}
            Ok(_) => return Err(SkipReason::HashNotUnique),
            Err(e) => {
                tracing::warn!("uniqueness check for {} failed: {e}", task.url);
                return Err(SkipReason::HistoryUnavailable);
            }
        }
    }

    if let Some(filter) = effective_filter(task, owner) {
        let target = result.extracted_target().unwrap_or_default();
        if !similarity::matches(target, &filter.words, filter.threshold) {
            return Err(SkipReason::NoSimilarity);
        }
    }

    Ok(())
}

/// The task's own filter if its word list is non-empty, else the
/// owner's, else none.
fn effective_filter<'a>(task: &'a WatchTask, owner: Option<&'a Owner>) -> Option<&'a WordFilter> {
    crate::effective(
        task.filter.as_ref(),
        owner.and_then(|o| o.filter.as_ref()),
        |f| !f.words.is_empty(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder;
    use crate::testutil::MemHistory;
    use pagewatch_core::types::WatchOptions;

    fn filter(words: &[&str], threshold: f64) -> WordFilter {
        WordFilter {
            words: words.iter().map(|s| s.to_string()).collect(),
            threshold,
        }
    }

    fn task_after(result: &ExecutionResult, options: WatchOptions) -> WatchTask {
        let mut task = WatchTask::new("https://a.test");
        task.options = options;
        recorder::apply(&mut task, result);
        task
    }

    #[test]
    fn failed_execution_skips() {
        let result = ExecutionResult::failure("boom");
        let task = task_after(&result, WatchOptions::default());
        let skip = should_notify(&task, &result, &MemHistory::empty(), None, None);
        assert_eq!(skip, Err(SkipReason::ExecutionFailed));
    }

    #[test]
    fn only_changed_requires_changed_hash() {
        // Same fingerprint twice: second cycle must skip.
        let mut task = WatchTask::new("https://a.test");
        task.options = WatchOptions {
            only_changed: true,
            ..WatchOptions::default()
        };
        recorder::apply(&mut task, &ExecutionResult::success("h1", "t", "c"));
        let repeat = ExecutionResult::success("h1", "t", "c");
        recorder::apply(&mut task, &repeat);
        let skip = should_notify(&task, &repeat, &MemHistory::empty(), None, None);
        assert_eq!(skip, Err(SkipReason::HashNotChanged));

        // New fingerprint: notify.
        let fresh = ExecutionResult::success("h2", "t", "c");
        recorder::apply(&mut task, &fresh);
        let ok = should_notify(&task, &fresh, &MemHistory::empty(), None, None);
        assert_eq!(ok, Ok(()));
    }

    #[test]
    fn only_unique_skips_when_hash_seen_before() {
        let options = WatchOptions {
            only_unique: true,
            ..WatchOptions::default()
        };
        let result = ExecutionResult::success("h1", "t", "c");
        let task = task_after(&result, options);

        let seen = MemHistory::with_count(1);
        assert_eq!(
            should_notify(&task, &result, &seen, None, None),
            Err(SkipReason::HashNotUnique)
        );

        let unseen = MemHistory::empty();
        assert_eq!(should_notify(&task, &result, &unseen, None, None), Ok(()));
    }

    #[test]
    fn history_failure_skips_without_notifying() {
        let options = WatchOptions {
            only_unique: true,
            ..WatchOptions::default()
        };
        let result = ExecutionResult::success("h1", "t", "c");
        let task = task_after(&result, options);
        let broken = MemHistory::failing();
        assert_eq!(
            should_notify(&task, &result, &broken, None, None),
            Err(SkipReason::HistoryUnavailable)
        );
    }

    #[test]
    fn own_filter_gates_on_similarity() {
        let result = ExecutionResult::success("h1", "price drop announced", "c");
        let mut task = task_after(&result, WatchOptions::default());

        task.filter = Some(filter(&["price"], 1.0));
        assert_eq!(
            should_notify(&task, &result, &MemHistory::empty(), None, None),
            Ok(())
        );

        task.filter = Some(filter(&["unrelated"], 1.0));
        assert_eq!(
            should_notify(&task, &result, &MemHistory::empty(), None, None),
            Err(SkipReason::NoSimilarity)
        );
    }

    #[test]
    fn empty_own_filter_falls_back_to_owner() {
        let result = ExecutionResult::success("h1", "price drop announced", "c");
        let mut task = task_after(&result, WatchOptions::default());
        task.filter = Some(filter(&[], 1.0));

        let owner = Owner {
            id: 7,
            name: "ana".into(),
            notifications: Vec::new(),
            filter: Some(filter(&["unrelated"], 1.0)),
        };
        assert_eq!(
            should_notify(&task, &result, &MemHistory::empty(), Some(&owner), None),
            Err(SkipReason::NoSimilarity)
        );
    }

    #[test]
    fn no_filter_anywhere_notifies() {
        let result = ExecutionResult::success("h1", "t", "c");
        let task = task_after(&result, WatchOptions::default());
        assert_eq!(
            should_notify(&task, &result, &MemHistory::empty(), None, None),
            Ok(())
        );
    }
}
