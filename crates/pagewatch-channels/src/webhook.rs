//! Webhook dispatcher — JSON POST carrying the task snapshot.

use async_trait::async_trait;

use pagewatch_core::error::{PagewatchError, Result};
use pagewatch_core::traits::Dispatcher;
use pagewatch_core::types::{ChannelConfig, ChannelKind, WatchTask};

pub struct WebhookDispatcher {
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dispatcher for WebhookDispatcher {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn deliver(&self, config: &ChannelConfig, message: &str, task: &WatchTask) -> Result<()> {
        let ChannelConfig::Webhook { url, .. } = config else {
            return Err(PagewatchError::Channel(
                "webhook dispatcher got a non-webhook config".into(),
            ));
        };

        let resp = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "task": task,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| PagewatchError::Channel(format!("Webhook send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::info!("Webhook notification sent to {url}");
            Ok(())
        } else {
            Err(PagewatchError::Channel(format!(
                "Webhook error {} from {url}",
                resp.status()
            )))
        }
    }
}
