//! Dispatch fan-out — concurrent, failure-isolated delivery to every
//! resolved channel.
//!
//! Deliveries are detached continuations: each runs in its own spawned
//! task, failures are logged and never rejoin the cycle. The returned
//! handles exist so tests can await completion; the scheduler drops
//! them — fan-out is done once every delivery is initiated.

use tokio::task::JoinHandle;

use pagewatch_channels::DispatcherSet;
use pagewatch_core::types::{ChannelConfig, Owner, WatchTask};

use crate::template;

/// Resolve the channel list and initiate one delivery per channel.
pub fn notify(
    task: &WatchTask,
    owner: Option<&Owner>,
    dispatchers: &DispatcherSet,
) -> Vec<JoinHandle<()>> {
    let channels = effective_channels(task, owner);
    if channels.is_empty() {
        tracing::info!("no notification channels configured for {}", task.url);
        return Vec::new();
    }

    let mut initiated = Vec::with_capacity(channels.len());
    for config in channels.iter().cloned() {
        let kind = config.kind();
        let Some(dispatcher) = dispatchers.get(kind) else {
            tracing::warn!("no {kind} dispatcher registered, dropping notification");
            continue;
        };

        let message = template::format_message(task, config.template());
        let task = task.clone();
        initiated.push(tokio::spawn(async move {
            if let Err(e) = dispatcher.deliver(&config, &message, &task).await {
                tracing::warn!("{kind} delivery for {} failed: {e}", task.url);
            }
        }));
    }
    initiated
}

/// The task's own channel list if non-empty, else the owner's.
fn effective_channels<'a>(task: &'a WatchTask, owner: Option<&'a Owner>) -> &'a [ChannelConfig] {
    crate::effective(
        Some(task.notifications.as_slice()),
        owner.map(|o| o.notifications.as_slice()),
        |channels| !channels.is_empty(),
    )
    .unwrap_or(&[])
}
