//! Deliberation state machine
//!
//! A proposal carries three independent statuses:
//! - deliberation: the organizers' decision (`PENDING` -> `ACCEPTED` | `REJECTED`)
//! - publication: whether the decision was announced to the speakers
//! - confirmation: the speaker's answer to an accepted, published proposal
//!
//! Every transition is checked here; callers persist the result.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Organizer decision on a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliberationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Whether the decision has been announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    #[default]
    NotPublished,
    Published,
}

/// Speaker answer to an accepted proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    Declined,
}

/// Outcome an organizer can deliberate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl From<Decision> for DeliberationStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accepted => DeliberationStatus::Accepted,
            Decision::Rejected => DeliberationStatus::Rejected,
        }
    }
}

/// Answer a speaker can give
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeakerAnswer {
    Confirmed,
    Declined,
}

impl From<SpeakerAnswer> for ConfirmationStatus {
    fn from(answer: SpeakerAnswer) -> Self {
        match answer {
            SpeakerAnswer::Confirmed => ConfirmationStatus::Confirmed,
            SpeakerAnswer::Declined => ConfirmationStatus::Declined,
        }
    }
}

/// Rejected transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Proposal has already been deliberated ({0})")]
    AlreadyDeliberated(DeliberationStatus),

    #[error("Proposal has not been deliberated yet")]
    NotDeliberated,

    #[error("Proposal result has already been published")]
    AlreadyPublished,

    #[error("Only accepted proposals can be confirmed (status is {0})")]
    NotAccepted(DeliberationStatus),

    #[error("Proposal result has not been published yet")]
    NotPublished,

    #[error("Proposal has already been answered ({0})")]
    AlreadyAnswered(ConfirmationStatus),

    #[error("Proposal status was changed by another request")]
    Concurrent,
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::Forbidden(err.to_string())
    }
}

/// Combined statuses of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliberationState {
    pub deliberation_status: DeliberationStatus,
    pub publication_status: PublicationStatus,
    pub confirmation_status: Option<ConfirmationStatus>,
}

impl DeliberationState {
    /// Record the organizers' decision. A decision is final.
    pub fn deliberate(&mut self, decision: Decision) -> Result<(), TransitionError> {
        if self.deliberation_status != DeliberationStatus::Pending {
            return Err(TransitionError::AlreadyDeliberated(self.deliberation_status));
        }
        self.deliberation_status = decision.into();
        Ok(())
    }

    /// Announce the decision. Accepted proposals start waiting for the speaker.
    pub fn publish(&mut self) -> Result<(), TransitionError> {
        if self.deliberation_status == DeliberationStatus::Pending {
            return Err(TransitionError::NotDeliberated);
        }
        if self.publication_status == PublicationStatus::Published {
            return Err(TransitionError::AlreadyPublished);
        }
        self.publication_status = PublicationStatus::Published;
        if self.deliberation_status == DeliberationStatus::Accepted {
            self.confirmation_status = Some(ConfirmationStatus::Pending);
        }
        Ok(())
    }

    /// Record the speaker's answer
    pub fn confirm(&mut self, answer: SpeakerAnswer) -> Result<(), TransitionError> {
        if self.deliberation_status != DeliberationStatus::Accepted {
            return Err(TransitionError::NotAccepted(self.deliberation_status));
        }
        if self.publication_status != PublicationStatus::Published {
            return Err(TransitionError::NotPublished);
        }
        match self.confirmation_status {
            Some(ConfirmationStatus::Pending) | None => {
                self.confirmation_status = Some(answer.into());
                Ok(())
            }
            Some(answered) => Err(TransitionError::AlreadyAnswered(answered)),
        }
    }

    /// Accepted, published and still waiting for the speaker
    pub fn awaits_confirmation(&self) -> bool {
        self.deliberation_status == DeliberationStatus::Accepted
            && self.publication_status == PublicationStatus::Published
            && self.confirmation_status == Some(ConfirmationStatus::Pending)
    }

    /// Whether the decision is visible to the speakers
    pub fn is_published(&self) -> bool {
        self.publication_status == PublicationStatus::Published
    }

    /// Statuses as a speaker may see them: an unpublished decision stays hidden.
    pub fn visible_to_speaker(&self) -> Self {
        if self.is_published() {
            *self
        } else {
            Self::default()
        }
    }
}

impl DeliberationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliberationStatus::Pending => "PENDING",
            DeliberationStatus::Accepted => "ACCEPTED",
            DeliberationStatus::Rejected => "REJECTED",
        }
    }
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::NotPublished => "NOT_PUBLISHED",
            PublicationStatus::Published => "PUBLISHED",
        }
    }
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Pending => "PENDING",
            ConfirmationStatus::Confirmed => "CONFIRMED",
            ConfirmationStatus::Declined => "DECLINED",
        }
    }
}

impl fmt::Display for DeliberationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliberationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DeliberationStatus::Pending),
            "ACCEPTED" => Ok(DeliberationStatus::Accepted),
            "REJECTED" => Ok(DeliberationStatus::Rejected),
            other => Err(AppError::BadRequest(format!(
                "Unknown deliberation status '{}'",
                other
            ))),
        }
    }
}

impl FromStr for PublicationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_PUBLISHED" => Ok(PublicationStatus::NotPublished),
            "PUBLISHED" => Ok(PublicationStatus::Published),
            other => Err(AppError::BadRequest(format!(
                "Unknown publication status '{}'",
                other
            ))),
        }
    }
}

impl FromStr for ConfirmationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ConfirmationStatus::Pending),
            "CONFIRMED" => Ok(ConfirmationStatus::Confirmed),
            "DECLINED" => Ok(ConfirmationStatus::Declined),
            other => Err(AppError::BadRequest(format!(
                "Unknown confirmation status '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn accepted_and_published() -> DeliberationState {
        let mut state = DeliberationState::default();
        state.deliberate(Decision::Accepted).unwrap();
        state.publish().unwrap();
        state
    }

    #[test]
    fn test_new_proposal_is_pending() {
        let state = DeliberationState::default();
        assert_eq!(state.deliberation_status, DeliberationStatus::Pending);
        assert_eq!(state.publication_status, PublicationStatus::NotPublished);
        assert_eq!(state.confirmation_status, None);
    }

    #[test]
    fn test_deliberation_is_final() {
        let mut state = DeliberationState::default();
        state.deliberate(Decision::Rejected).unwrap();
        assert_eq!(state.deliberation_status, DeliberationStatus::Rejected);

        let err = state.deliberate(Decision::Accepted).unwrap_err();
        assert_eq!(
            err,
            TransitionError::AlreadyDeliberated(DeliberationStatus::Rejected)
        );
    }

    #[test]
    fn test_publish_requires_decision() {
        let mut state = DeliberationState::default();
        assert_eq!(state.publish().unwrap_err(), TransitionError::NotDeliberated);
    }

    #[test]
    fn test_publish_accepted_awaits_confirmation() {
        let state = accepted_and_published();
        assert_eq!(state.confirmation_status, Some(ConfirmationStatus::Pending));
        assert!(state.awaits_confirmation());
    }

    #[test]
    fn test_publish_rejected_has_no_confirmation() {
        let mut state = DeliberationState::default();
        state.deliberate(Decision::Rejected).unwrap();
        state.publish().unwrap();
        assert_eq!(state.confirmation_status, None);
        assert_eq!(state.publish().unwrap_err(), TransitionError::AlreadyPublished);
    }

    #[test]
    fn test_confirm_fails_when_not_accepted() {
        let mut pending = DeliberationState::default();
        assert_eq!(
            pending.confirm(SpeakerAnswer::Confirmed).unwrap_err(),
            TransitionError::NotAccepted(DeliberationStatus::Pending)
        );

        let mut rejected = DeliberationState::default();
        rejected.deliberate(Decision::Rejected).unwrap();
        rejected.publish().unwrap();
        assert_eq!(
            rejected.confirm(SpeakerAnswer::Confirmed).unwrap_err(),
            TransitionError::NotAccepted(DeliberationStatus::Rejected)
        );
    }

    #[test]
    fn test_confirm_fails_before_publication() {
        let mut state = DeliberationState::default();
        state.deliberate(Decision::Accepted).unwrap();
        assert_eq!(
            state.confirm(SpeakerAnswer::Confirmed).unwrap_err(),
            TransitionError::NotPublished
        );
        assert_eq!(state.confirmation_status, None);
    }

    #[test]
    fn test_confirm_and_decline() {
        let mut confirmed = accepted_and_published();
        confirmed.confirm(SpeakerAnswer::Confirmed).unwrap();
        assert_eq!(confirmed.confirmation_status, Some(ConfirmationStatus::Confirmed));
        assert!(!confirmed.awaits_confirmation());

        let mut declined = accepted_and_published();
        declined.confirm(SpeakerAnswer::Declined).unwrap();
        assert_eq!(declined.confirmation_status, Some(ConfirmationStatus::Declined));
    }

    #[test]
    fn test_answer_is_final() {
        let mut state = accepted_and_published();
        state.confirm(SpeakerAnswer::Declined).unwrap();
        assert_eq!(
            state.confirm(SpeakerAnswer::Confirmed).unwrap_err(),
            TransitionError::AlreadyAnswered(ConfirmationStatus::Declined)
        );
    }

    #[test]
    fn test_unpublished_decision_is_hidden_from_speakers() {
        let mut state = DeliberationState::default();
        state.deliberate(Decision::Rejected).unwrap();
        assert_eq!(state.visible_to_speaker(), DeliberationState::default());

        state.publish().unwrap();
        assert_eq!(state.visible_to_speaker(), state);
    }

    #[test]
    fn test_transition_error_is_forbidden() {
        let err: AppError = TransitionError::NotPublished.into();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            DeliberationStatus::Pending,
            DeliberationStatus::Accepted,
            DeliberationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<DeliberationStatus>().unwrap(), status);
        }
        assert!("MAYBE".parse::<ConfirmationStatus>().is_err());
    }

    #[test]
    fn test_statuses_display_as_wire_strings() {
        assert_eq!(PublicationStatus::NotPublished.to_string(), "NOT_PUBLISHED");
        assert_eq!(PublicationStatus::Published.to_string(), "PUBLISHED");
        assert_eq!(DeliberationStatus::Accepted.to_string(), "ACCEPTED");
        assert_eq!(ConfirmationStatus::Declined.to_string(), "DECLINED");
    }
}
