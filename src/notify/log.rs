use crate::error::{Result, VisitorError};
use crate::notify::traits::{Notification, Notifier};
use async_trait::async_trait;

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn id(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            subject = %notification.subject,
            visitor = notification.visitor.as_deref().unwrap_or("-"),
            "notification (log transport):\n{}",
            notification.body
        );
        Ok(())
    }
}

/// Stand-in used when sender, recipient or credentials are missing.
///
/// Every send fails so the gap shows up in the logs instead of mail silently
/// going nowhere.
#[derive(Debug, Default)]
pub struct UnconfiguredNotifier;

#[async_trait]
impl Notifier for UnconfiguredNotifier {
    fn id(&self) -> &'static str {
        "unconfigured"
    }

    async fn notify(&self, _notification: &Notification) -> Result<()> {
        Err(VisitorError::Notify(
            "email configuration is missing".to_owned(),
        ))
    }
}
