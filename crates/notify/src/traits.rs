//! Mailer trait definition and shared error types.

/// Errors that can occur during email delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("SMTP is not configured (set SMTP_HOST, SMTP_USER and SMTP_PASSWORD)")]
    NotConfigured,
}

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Plain-text alternative.
    pub text: String,
}

/// Trait for email transports.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one email.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError>;

    /// Whether mail actually leaves the process.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Human-readable name for this transport (e.g., "smtp").
    fn channel_name(&self) -> &str;
}

/// Used when SMTP is not configured. Every send fails with `NotConfigured`
/// so callers can decide whether that matters.
#[derive(Debug, Default)]
pub struct NoopMailer;

#[async_trait::async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        tracing::debug!(to = %email.to, subject = %email.subject, "SMTP not configured, email dropped");
        Err(NotifyError::NotConfigured)
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn channel_name(&self) -> &str {
        "noop"
    }
}
