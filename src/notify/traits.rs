use async_trait::async_trait;

/// A single outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// Visitor the notification is about, when it concerns exactly one.
    pub visitor: Option<String>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            visitor: None,
        }
    }

    pub fn about(mut self, visitor: impl Into<String>) -> Self {
        self.visitor = Some(visitor.into());
        self
    }
}

/// Notification transport contract. New transports only need to implement this trait.
///
/// Implementations must not retry internally; timeouts are applied by
/// [`crate::notify::dispatch`].
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable transport identifier (e.g. `relay`, `log`).
    fn id(&self) -> &'static str;

    /// Deliver one notification.
    async fn notify(&self, notification: &Notification) -> crate::Result<()>;
}
