//! Telegram dispatcher — delivers via the Bot API `sendMessage`.

use async_trait::async_trait;

use pagewatch_core::error::{PagewatchError, Result};
use pagewatch_core::traits::Dispatcher;
use pagewatch_core::types::{ChannelConfig, ChannelKind, WatchTask};

pub struct TelegramDispatcher {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramDispatcher {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": escape_markdown(text),
                "parse_mode": "Markdown",
            }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| PagewatchError::Channel(format!("Telegram send failed: {e}")))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(PagewatchError::Channel(format!(
                "Telegram API error {status}: {body}"
            )))
        }
    }
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Telegram
    }

    async fn deliver(
        &self,
        config: &ChannelConfig,
        message: &str,
        _task: &WatchTask,
    ) -> Result<()> {
        let ChannelConfig::Telegram { chat_id, .. } = config else {
            return Err(PagewatchError::Channel(
                "telegram dispatcher got a non-telegram config".into(),
            ));
        };
        self.send_message(*chat_id, message).await?;
        tracing::info!("Telegram notification sent to chat {chat_id}");
        Ok(())
    }
}

/// Escape Telegram MarkdownV1 special characters.
fn escape_markdown(s: &str) -> String {
    s.replace('_', "\\_")
        .replace('*', "\\*")
        .replace('[', "\\[")
        .replace('`', "\\`")
}
