//! Execution runner — one fetch/extract attempt per call.
//!
//! Ordinary upstream failures never propagate: whatever the fetcher
//! reports (or throws) becomes a `Failure` result for the recorder to
//! snapshot. Only programming errors escape.

use pagewatch_core::traits::Fetcher;
use pagewatch_core::types::{ExecutionResult, WatchTask};

pub async fn run(fetcher: &dyn Fetcher, task: &WatchTask) -> ExecutionResult {
    match fetcher.fetch(&task.url).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("fetch of {} failed: {e}", task.url);
            ExecutionResult::failure(e.to_string())
        }
    }
}
