//! Proposal models
//!
//! A proposal is a talk submitted by one or more speakers to an event.

use crate::deliberation::{Decision, DeliberationState, DeliberationStatus, SpeakerAnswer};
use crate::error::AppError;
use crate::models::{CfpState, EventType, SpeakerInfo};
use crate::review::ReviewSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Audience level of a talk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ProposalLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalLevel::Beginner => "BEGINNER",
            ProposalLevel::Intermediate => "INTERMEDIATE",
            ProposalLevel::Advanced => "ADVANCED",
        }
    }
}

impl FromStr for ProposalLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BEGINNER" => Ok(ProposalLevel::Beginner),
            "INTERMEDIATE" => Ok(ProposalLevel::Intermediate),
            "ADVANCED" => Ok(ProposalLevel::Advanced),
            other => Err(AppError::BadRequest(format!("Unknown level '{}'", other))),
        }
    }
}

/// A talk proposal submitted to an event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub level: Option<ProposalLevel>,
    pub languages: Vec<String>,
    pub references: Option<String>,
    /// Speaker user ids, the submitter first
    pub speakers: Vec<Uuid>,
    #[serde(flatten)]
    pub deliberation: DeliberationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(event_id: Uuid, speaker_id: Uuid, request: SubmitProposalRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id,
            title: request.title.trim().to_string(),
            abstract_text: request.abstract_text.trim().to_string(),
            level: request.level,
            languages: request.languages,
            references: request.references,
            speakers: vec![speaker_id],
            deliberation: DeliberationState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_speaker(&self, user_id: Uuid) -> bool {
        self.speakers.contains(&user_id)
    }

    /// Apply a speaker edit. Absent fields are left unchanged.
    pub fn apply(&mut self, update: UpdateProposalRequest) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(abstract_text) = update.abstract_text {
            self.abstract_text = abstract_text.trim().to_string();
        }
        if let Some(level) = update.level {
            self.level = Some(level);
        }
        if let Some(languages) = update.languages {
            self.languages = languages;
        }
        if let Some(references) = update.references {
            self.references = Some(references);
        }
        self.updated_at = Utc::now();
    }
}

/// Request to submit a proposal
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProposalRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,
    #[serde(rename = "abstract")]
    #[validate(length(min = 1, max = 5000, message = "Abstract must be between 1 and 5000 characters"))]
    pub abstract_text: String,
    pub level: Option<ProposalLevel>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[validate(length(max = 5000, message = "References are too long"))]
    pub references: Option<String>,
}

/// Request to edit a proposal
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProposalRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    #[validate(length(min = 1, max = 5000, message = "Abstract must be between 1 and 5000 characters"))]
    pub abstract_text: Option<String>,
    pub level: Option<ProposalLevel>,
    pub languages: Option<Vec<String>>,
    #[validate(length(max = 5000, message = "References are too long"))]
    pub references: Option<String>,
}

/// Organizer decision
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliberationRequest {
    pub status: Decision,
}

/// Publication of every decided proposal of one outcome
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRequest {
    pub outcome: Decision,
    #[serde(default = "default_true")]
    pub send_email: bool,
}

fn default_true() -> bool {
    true
}

/// Result of a publication
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicationResult {
    pub published: usize,
    pub emails_queued: usize,
}

/// Speaker answer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub answer: SpeakerAnswer,
}

/// Status filter of the organizer proposal list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    Pending,
    Accepted,
    Rejected,
    /// Accepted and published, speaker has not answered yet
    NotAnswered,
    Confirmed,
    Declined,
}

/// Filter on the caller's own ratings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewFilter {
    Reviewed,
    NotReviewed,
}

/// Sort order of the organizer proposal list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
}

/// Query string of the organizer proposal list
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalListQuery {
    pub status: Option<StatusFilter>,
    pub query: Option<String>,
    pub reviews: Option<ReviewFilter>,
    #[serde(default)]
    pub sort: SortOrder,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// The caller's own rating, as shown in listings
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnRating {
    pub feeling: crate::models::Feeling,
    pub score: Option<i32>,
}

/// Organizer listing entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(flatten)]
    pub deliberation: DeliberationState,
    /// Empty when the event hides speakers from reviewers
    pub speakers: Vec<SpeakerInfo>,
    /// `None` when the event hides ratings from the caller
    pub reviews: Option<ReviewSummary>,
    pub my_review: Option<OwnRating>,
    pub created_at: DateTime<Utc>,
}

/// A page of the organizer listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPage {
    pub proposals: Vec<ProposalSummary>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Speaker-side view of a proposal
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerProposal {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub event_slug: String,
    pub event_name: String,
}

/// Entry of the speaker notification feed
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerNotification {
    pub kind: NotificationKind,
    pub proposal_id: Uuid,
    pub proposal_title: String,
    pub event_slug: String,
    pub event_name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Accepted and published, waiting for the speaker's answer
    AcceptedProposal,
}

/// Query string of the export endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub key: Option<String>,
    pub status: Option<DeliberationStatus>,
}

/// Proposal as exported to third-party tools
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedProposal {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub level: Option<ProposalLevel>,
    pub languages: Vec<String>,
    #[serde(flatten)]
    pub deliberation: DeliberationState,
    pub speakers: Vec<SpeakerInfo>,
    pub reviews: ReviewSummary,
}

/// Payload of the export endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventExport {
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub cfp_state: CfpState,
    pub proposals: Vec<ExportedProposal>,
}
