//! Handler contract: deliver one notification to one sink

use crate::notification::Notification;
use crate::Result;
use async_trait::async_trait;
use tracing::info;

/// A pluggable delivery sink.
///
/// The monitor may call `handle` on the same instance concurrently, so
/// implementations must not assume serialized calls. An error only marks
/// this handler's delivery as failed.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, notification: &Notification) -> Result<()>;
}

/// Writes every notification to the tracing log
#[derive(Debug, Clone, Default)]
pub struct LogHandler;

impl LogHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for LogHandler {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle(&self, notification: &Notification) -> Result<()> {
        let links: Vec<String> = notification
            .links
            .iter()
            .map(|(label, url)| format!("{}={}", label, url))
            .collect();

        info!(
            key = %notification.key,
            logs = notification.logs.len(),
            links = %links.join(", "),
            "{}: {}",
            notification.title,
            notification.description
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[tokio::test]
    async fn log_handler_never_fails() {
        let handler = LogHandler::new();
        let notification = Notification::new("k", "Job failed", "job x failed")
            .with_logs(vec!["boom".to_string()])
            .with_link("Open", Url::parse("https://example.com/x").unwrap());

        assert!(handler.handle(&notification).await.is_ok());
        assert_eq!(handler.name(), "log");
    }
}
