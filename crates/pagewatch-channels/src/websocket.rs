//! Live-socket dispatcher — publishes into an in-process broadcast hub
//! that the gateway's WebSocket handler drains to connected clients.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use pagewatch_core::error::Result;
use pagewatch_core::traits::Dispatcher;
use pagewatch_core::types::{ChannelConfig, ChannelKind, WatchTask};

/// Broadcast hub decoupling the notification pipeline from socket
/// transport: the dispatcher publishes, each connected client holds a
/// subscription.
pub struct SocketHub {
    tx: broadcast::Sender<String>,
}

impl SocketHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Publish a payload to all connected clients. Zero subscribers is
    /// not a failure — pushes are best-effort by design.
    pub fn publish(&self, payload: String) -> usize {
        self.tx.send(payload).unwrap_or(0)
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SocketHub {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WebsocketDispatcher {
    hub: Arc<SocketHub>,
}

impl WebsocketDispatcher {
    pub fn new(hub: Arc<SocketHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Dispatcher for WebsocketDispatcher {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Websocket
    }

    async fn deliver(
        &self,
        _config: &ChannelConfig,
        message: &str,
        task: &WatchTask,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "type": "watch_update",
            "task": task,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let reached = self.hub.publish(payload.to_string());
        tracing::debug!("socket push for task {} reached {reached} client(s)", task.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hub_delivers_to_subscribers() {
        let hub = Arc::new(SocketHub::new());
        let mut rx = hub.subscribe();

        let dispatcher = WebsocketDispatcher::new(hub.clone());
        let task = WatchTask::new("https://a.test");
        dispatcher
            .deliver(
                &ChannelConfig::Websocket { template: None },
                "changed",
                &task,
            )
            .await
            .unwrap();

        let payload = rx.recv().await.unwrap();
        assert!(payload.contains("\"type\":\"watch_update\""));
        assert!(payload.contains("https://a.test"));
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let hub = SocketHub::new();
        assert_eq!(hub.publish("x".into()), 0);
    }
}
