//! Outbound email notifications
//!
//! Messages are plain subject/body pairs. Delivery goes through the
//! [`Mailer`] seam; the default transport only logs what would be sent.

pub mod campaign;
pub mod queue;

pub use campaign::{publication_messages, spawn_campaign};
pub use queue::{MailQueue, RetryPolicy};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// A single email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(String),

    #[error("Mail queue is closed")]
    QueueClosed,
}

/// Email transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Transport that writes deliveries to the log
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            "📧 Email delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = LogMailer::new("cfp@example.org");
        let message = EmailMessage {
            to: "speaker@example.org".to_string(),
            subject: "Hello".to_string(),
            body: "World".to_string(),
        };
        assert_ok!(mailer.send(&message).await);
    }
}
