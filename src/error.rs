//! Error types for the visitor register.

/// Top-level error type for presence tracking, persistence and notification.
#[derive(Debug, thiserror::Error)]
pub enum VisitorError {
    /// Missing or malformed input at the HTTP boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// A sign-in would overwrite a visitor who is still on site.
    #[error("visitor already signed in: {0}")]
    DuplicateActiveVisitor(String),

    /// No record exists for the given visitor name.
    #[error("visitor not found: {0}")]
    NotFound(String),

    /// The visitor's record has already been closed by a sign-out.
    #[error("visitor already signed out: {0}")]
    AlreadySignedOut(String),

    /// Persisted state exists but cannot be parsed.
    #[error("corrupt visitor state: {0}")]
    CorruptState(String),

    /// Persistence read/write failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Notification transport failure.
    #[error("notify error: {0}")]
    Notify(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for VisitorError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VisitorError>;
