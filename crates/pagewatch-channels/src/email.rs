//! Email dispatcher — outbound SMTP via async lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, Tokio1Executor};

use pagewatch_core::config::EmailSettings;
use pagewatch_core::error::{PagewatchError, Result};
use pagewatch_core::traits::Dispatcher;
use pagewatch_core::types::{ChannelConfig, ChannelKind, WatchTask};

pub struct EmailDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailDispatcher {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let from_addr = settings.from.as_deref().unwrap_or(&settings.username);
        let from: Mailbox = format!("Pagewatch <{from_addr}>")
            .parse()
            .map_err(|e| PagewatchError::Channel(format!("Invalid from address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
            .map_err(|e| PagewatchError::Channel(format!("SMTP relay: {e}")))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }

    fn subject_for(task: &WatchTask) -> String {
        if task.name.is_empty() {
            format!("Watch update: {}", task.url)
        } else {
            format!("Watch update: {}", task.name)
        }
    }
}

#[async_trait]
impl Dispatcher for EmailDispatcher {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn deliver(&self, config: &ChannelConfig, message: &str, task: &WatchTask) -> Result<()> {
        let ChannelConfig::Email { to, .. } = config else {
            return Err(PagewatchError::Channel(
                "email dispatcher got a non-email config".into(),
            ));
        };

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| PagewatchError::Channel(format!("Invalid to address: {e}")))?;

        let email = LettreMessage::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(Self::subject_for(task))
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .map_err(|e| PagewatchError::Channel(format!("Build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| PagewatchError::Channel(format!("SMTP send to {to}: {e}")))?;

        tracing::info!("Email notification sent to {to}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_prefers_task_name() {
        let mut task = WatchTask::new("https://a.test/page");
        assert_eq!(
            EmailDispatcher::subject_for(&task),
            "Watch update: https://a.test/page"
        );
        task.name = "frontpage".into();
        assert_eq!(EmailDispatcher::subject_for(&task), "Watch update: frontpage");
    }
}
