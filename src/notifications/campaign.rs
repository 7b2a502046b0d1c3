//! Result announcement campaigns

use super::{EmailMessage, MailError, MailQueue};
use crate::deliberation::DeliberationStatus;
use crate::models::{Event, Proposal, User};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// One message per speaker per proposal announcing its result.
/// Pending proposals and speakers without an account are skipped.
pub fn publication_messages(
    event: &Event,
    proposals: &[Proposal],
    users: &HashMap<Uuid, User>,
) -> Vec<EmailMessage> {
    let mut messages = Vec::new();
    for proposal in proposals {
        let status = proposal.deliberation.deliberation_status;
        if status == DeliberationStatus::Pending {
            continue;
        }
        for speaker_id in &proposal.speakers {
            let Some(speaker) = users.get(speaker_id) else {
                continue;
            };
            messages.push(result_message(event, proposal, speaker, status));
        }
    }
    messages
}

fn result_message(
    event: &Event,
    proposal: &Proposal,
    speaker: &User,
    status: DeliberationStatus,
) -> EmailMessage {
    let (subject, body) = if status == DeliberationStatus::Accepted {
        (
            format!("[{}] Your talk has been accepted", event.name),
            format!(
                "Hi {},\n\nCongratulations! \"{}\" has been accepted to {}.\n\
                 Please confirm or decline your participation from your speaker space.\n",
                speaker.name, proposal.title, event.name
            ),
        )
    } else {
        (
            format!("[{}] Your talk has been declined", event.name),
            format!(
                "Hi {},\n\nThank you for submitting \"{}\" to {}.\n\
                 Unfortunately it has not been selected this time.\n",
                speaker.name, proposal.title, event.name
            ),
        )
    };

    EmailMessage {
        to: speaker.email.clone(),
        subject,
        body,
    }
}

/// Split `messages` into batches of `batch_size` and enqueue them.
/// Returns the number of messages queued.
pub async fn enqueue_in_batches(
    queue: &MailQueue,
    messages: Vec<EmailMessage>,
    batch_size: usize,
) -> Result<usize, MailError> {
    let total = messages.len();
    let mut remaining = messages.into_iter().peekable();
    while remaining.peek().is_some() {
        let batch: Vec<EmailMessage> = remaining.by_ref().take(batch_size.max(1)).collect();
        queue.enqueue(batch).await?;
    }
    Ok(total)
}

/// Enqueue `messages` from a background task so the caller never waits on a
/// full queue. Returns the number of messages handed over.
pub fn spawn_campaign(queue: &MailQueue, messages: Vec<EmailMessage>, batch_size: usize) -> usize {
    let total = messages.len();
    if total == 0 {
        return 0;
    }
    let queue = queue.clone();
    tokio::spawn(async move {
        if let Err(e) = enqueue_in_batches(&queue, messages, batch_size).await {
            warn!(error = %e, count = total, "Could not queue campaign emails");
        }
    });
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliberation::Decision;
    use crate::models::{EventType, SubmitProposalRequest};
    use crate::notifications::queue::QUEUE_CAPACITY;
    use crate::notifications::{Mailer, RetryPolicy};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Mutex, Semaphore};

    fn speaker(name: &str) -> User {
        User::new(format!("{}@example.org", name), "hash".to_string(), name)
    }

    fn proposal(event: &Event, speakers: &[&User], decision: Option<Decision>) -> Proposal {
        let request = SubmitProposalRequest {
            title: "Zero-cost abstractions".to_string(),
            abstract_text: "What they really cost".to_string(),
            level: None,
            languages: vec![],
            references: None,
        };
        let mut proposal = Proposal::new(event.id, speakers[0].id, request);
        proposal.speakers = speakers.iter().map(|s| s.id).collect();
        if let Some(decision) = decision {
            proposal.deliberation.deliberate(decision).unwrap();
        }
        proposal
    }

    #[test]
    fn test_one_message_per_speaker() {
        let event = Event::new(Uuid::new_v4(), "RustConf", "rustconf", EventType::Conference);
        let (alice, bob) = (speaker("alice"), speaker("bob"));
        let users: HashMap<Uuid, User> =
            [(alice.id, alice.clone()), (bob.id, bob.clone())].into_iter().collect();

        let proposals = vec![
            proposal(&event, &[&alice, &bob], Some(Decision::Accepted)),
            proposal(&event, &[&bob], Some(Decision::Rejected)),
            proposal(&event, &[&alice], None),
        ];

        let messages = publication_messages(&event, &proposals, &users);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].to, "alice@example.org");
        assert!(messages[0].subject.contains("accepted"));
        assert_eq!(messages[2].to, "bob@example.org");
        assert!(messages[2].subject.contains("declined"));
    }

    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl Mailer for Recorder {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            self.0.lock().await.push(message.to.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_enqueue_in_batches_delivers_everything() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let (queue, worker) = MailQueue::start(recorder.clone(), policy);

        let messages: Vec<EmailMessage> = (0..7)
            .map(|i| EmailMessage {
                to: format!("s{}@x.io", i),
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .collect();
        let queued = enqueue_in_batches(&queue, messages, 3).await.unwrap();
        assert_eq!(queued, 7);

        drop(queue);
        worker.await.unwrap();
        assert_eq!(recorder.0.lock().await.len(), 7);
    }

    /// Holds every delivery until the gate opens
    struct Gated {
        gate: Semaphore,
        sent: Mutex<usize>,
    }

    #[async_trait]
    impl Mailer for Gated {
        async fn send(&self, _message: &EmailMessage) -> Result<(), MailError> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;
            *self.sent.lock().await += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_spawned_campaign_does_not_wait_for_a_full_queue() {
        let mailer = Arc::new(Gated {
            gate: Semaphore::new(0),
            sent: Mutex::new(0),
        });
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        };
        let (queue, worker) = MailQueue::start(mailer.clone(), policy);

        // One message per batch: more batches than the channel holds
        let count = QUEUE_CAPACITY + 6;
        let messages: Vec<EmailMessage> = (0..count)
            .map(|i| EmailMessage {
                to: format!("s{}@x.io", i),
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .collect();
        assert_eq!(spawn_campaign(&queue, messages, 1), count);
        assert_eq!(spawn_campaign(&queue, Vec::new(), 1), 0);

        drop(queue);
        mailer.gate.add_permits(1);
        worker.await.unwrap();
        assert_eq!(*mailer.sent.lock().await, count);
    }
}
