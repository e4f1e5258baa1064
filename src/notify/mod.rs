//! Notifier gateway.
//!
//! Store and scheduler hand finished notifications to a [`Notifier`] through
//! [`dispatch`], which bounds every send and reports failures without ever
//! feeding them back into visitor state.

pub mod log;
pub mod message;
pub mod recording;
pub mod relay;
pub mod traits;

pub use log::{LogNotifier, UnconfiguredNotifier};
pub use recording::RecordingNotifier;
pub use relay::RelayNotifier;
pub use traits::{Notification, Notifier};

use crate::config::{EmailConfig, EmailTransport};
use crate::error::{Result, VisitorError};
use std::sync::Arc;
use std::time::Duration;

/// Send `notification`, giving up after `timeout`.
///
/// # Errors
/// Returns `Notify` on transport failure or timeout. The failure is also
/// logged here, so callers may drop it.
pub async fn dispatch(
    notifier: &dyn Notifier,
    notification: &Notification,
    timeout: Duration,
) -> Result<()> {
    match tokio::time::timeout(timeout, notifier.notify(notification)).await {
        Ok(Ok(())) => {
            tracing::debug!(
                transport = notifier.id(),
                subject = %notification.subject,
                "notification sent"
            );
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::warn!(
                transport = notifier.id(),
                subject = %notification.subject,
                error = %e,
                "notification failed"
            );
            Err(e)
        }
        Err(_) => {
            tracing::warn!(
                transport = notifier.id(),
                subject = %notification.subject,
                timeout = ?timeout,
                "notification timed out"
            );
            Err(VisitorError::Notify(format!("timed out after {timeout:?}")))
        }
    }
}

/// Build the transport selected by `config`.
///
/// A relay transport with missing sender, recipient, password or URL falls
/// back to [`UnconfiguredNotifier`].
///
/// # Errors
/// Returns `Config` if the relay client cannot be constructed.
pub fn build_notifier(config: &EmailConfig) -> Result<Arc<dyn Notifier>> {
    match config.transport {
        EmailTransport::Log => Ok(Arc::new(LogNotifier)),
        EmailTransport::Relay => {
            let Some(relay) = config.relay_settings() else {
                tracing::warn!("email configuration is missing; notifications will fail");
                return Ok(Arc::new(UnconfiguredNotifier));
            };
            let notifier = RelayNotifier::new(
                relay.url,
                relay.sender,
                relay.recipient,
                relay.password,
                config.timeout(),
            )?;
            Ok(Arc::new(notifier))
        }
    }
}
