//! Trait seams for the pipeline's collaborators.
//!
//! The scheduler core only ever talks to these traits; the concrete
//! fetcher, the sqlite store, and the channel dispatchers plug in at
//! process wiring time (and mocks plug in under test).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChannelConfig, ChannelKind, ExecutionResult, Owner, WatchTask};

/// Fetch/extract collaborator. Ordinary upstream failures come back as
/// `Ok(ExecutionResult::Failure { .. })` or as `Err` — the execution
/// runner converts either into the failure result shape.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ExecutionResult>;
}

/// Watch-task storage.
pub trait TaskStore: Send + Sync {
    /// Tasks eligible for scheduling: everything that is not a
    /// dependency of another task.
    fn load_eligible(&self) -> Result<Vec<WatchTask>>;
    fn list(&self) -> Result<Vec<WatchTask>>;
    fn get(&self, id: i64) -> Result<Option<WatchTask>>;
    /// Insert a new task and return its assigned id.
    fn insert(&self, task: &WatchTask) -> Result<i64>;
    fn save(&self, task: &WatchTask) -> Result<()>;
    fn delete(&self, id: i64) -> Result<bool>;
}

/// Owner lookups, used to resolve fallback notifications and filters.
pub trait OwnerStore: Send + Sync {
    fn owner(&self, id: i64) -> Result<Option<Owner>>;
}

/// Append-only record of executions, read back only for the uniqueness
/// check.
pub trait ExecutionHistory: Send + Sync {
    /// Record one execution and return its row id.
    fn record(&self, url: &str, result: &ExecutionResult) -> Result<i64>;
    /// How many other executions of `url` produced `hash`, excluding the
    /// given record.
    fn count_by_hash(&self, url: &str, hash: &str, exclude_id: Option<i64>) -> Result<u64>;
}

/// One delivery transport. Implementations are opaque beyond
/// success/failure; the fan-out isolates and logs whatever comes back.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn kind(&self) -> ChannelKind;
    async fn deliver(&self, config: &ChannelConfig, message: &str, task: &WatchTask)
    -> Result<()>;
}
