use crate::formatter::{format_slack_message, DEFAULT_MAX_LOG_LINES};
use crate::slack_client::SlackClient;
use async_trait::async_trait;
use keiho_core::{Handler, Notification};
use tracing::info;

/// Posts every notification to one Slack channel
pub struct SlackHandler {
    client: SlackClient,
    channel: String,
    max_log_lines: usize,
}

impl SlackHandler {
    pub fn new(client: SlackClient, channel: impl Into<String>) -> Self {
        Self {
            client,
            channel: channel.into(),
            max_log_lines: DEFAULT_MAX_LOG_LINES,
        }
    }

    pub fn with_max_log_lines(mut self, max_log_lines: usize) -> Self {
        self.max_log_lines = max_log_lines;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl Handler for SlackHandler {
    fn name(&self) -> &str {
        "slack"
    }

    async fn handle(&self, notification: &Notification) -> keiho_core::Result<()> {
        let message = format_slack_message(notification, &self.channel, self.max_log_lines);
        self.client.post_message(&message).await?;

        info!(
            "Delivered notification {} to Slack channel {}",
            notification.key, self.channel
        );
        Ok(())
    }
}
