use crate::error::{Result, VisitorError};
use crate::notify::traits::{Notification, Notifier};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Mail transport that hands messages to an HTTP mail relay.
///
/// The relay owns SMTP delivery; this side only posts
/// `{from, to, subject, text}` and checks the status code.
pub struct RelayNotifier {
    endpoint: String,
    sender: String,
    recipient: String,
    token: String,
    client: reqwest::Client,
}

impl RelayNotifier {
    /// # Errors
    /// Returns `Config` if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VisitorError::Config(format!("cannot build relay client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            token: token.into(),
            client,
        })
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    fn id(&self) -> &'static str {
        "relay"
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        let body = json!({
            "from": self.sender,
            "to": self.recipient,
            "subject": notification.subject,
            "text": notification.body,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| VisitorError::Notify(format!("relay request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(VisitorError::Notify(format!(
                "relay returned {status}: {text}"
            )));
        }

        Ok(())
    }
}
