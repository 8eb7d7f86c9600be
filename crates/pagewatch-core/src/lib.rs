//! # Pagewatch Core
//! Shared foundation for the pagewatch workspace: the watch-task data
//! model, the configuration system, the error type, and the trait seams
//! behind which the fetcher, the stores, and the channel dispatchers live.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::PagewatchConfig;
pub use error::{PagewatchError, Result};
pub use traits::{Dispatcher, ExecutionHistory, Fetcher, OwnerStore, TaskStore};
pub use types::{
    ChannelConfig, ChannelKind, ExecutionResult, LastExecution, Owner, WatchOptions, WatchTask,
    WordFilter,
};
