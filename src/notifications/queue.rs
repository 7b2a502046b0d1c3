//! Email delivery queue
//!
//! Jobs are batches of messages sent over a tokio channel to a single
//! worker task. Each message is retried with exponential backoff.

use super::{EmailMessage, MailError, Mailer};
use crate::config::MailConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

pub(crate) const QUEUE_CAPACITY: usize = 64;
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Retry schedule of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: MAX_DELAY,
        }
    }
}

impl From<&MailConfig> for RetryPolicy {
    fn from(config: &MailConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.retry_base(),
            max_delay: MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the `failed_attempt`-th failure (1-based).
    /// Doubles every time, capped at `max_delay`.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Send one message, retrying on failure.
/// Returns the number of attempts it took.
pub async fn deliver_with_retry(
    mailer: &dyn Mailer,
    message: &EmailMessage,
    policy: &RetryPolicy,
) -> Result<u32, MailError> {
    let mut attempt = 1;
    loop {
        match mailer.send(message).await {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt >= policy.max_attempts => {
                error!(to = %message.to, attempts = attempt, error = %e, "Giving up on email");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    to = %message.to,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Email delivery failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Handle used to enqueue email batches
#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::Sender<Vec<EmailMessage>>,
}

impl MailQueue {
    /// Spawn the delivery worker. It stops once every handle is dropped.
    pub fn start(mailer: Arc<dyn Mailer>, policy: RetryPolicy) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<Vec<EmailMessage>>(QUEUE_CAPACITY);

        let worker = tokio::spawn(async move {
            while let Some(batch) = receiver.recv().await {
                debug!(size = batch.len(), "Processing email batch");
                for message in &batch {
                    // Failures are logged by deliver_with_retry
                    let _ = deliver_with_retry(mailer.as_ref(), message, &policy).await;
                }
            }
            debug!("Mail queue worker stopped");
        });

        (Self { sender }, worker)
    }

    pub async fn enqueue(&self, batch: Vec<EmailMessage>) -> Result<(), MailError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.sender
            .send(batch)
            .await
            .map_err(|_| MailError::QueueClosed)
    }
}
