//! Proposal comments

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Audience of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentChannel {
    /// Internal to the organizing team
    Organizer,
    /// Conversation between the team and the speakers
    Speaker,
}

impl CommentChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentChannel::Organizer => "ORGANIZER",
            CommentChannel::Speaker => "SPEAKER",
        }
    }
}

impl FromStr for CommentChannel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORGANIZER" => Ok(CommentChannel::Organizer),
            "SPEAKER" => Ok(CommentChannel::Speaker),
            other => Err(AppError::BadRequest(format!("Unknown channel '{}'", other))),
        }
    }
}

/// A note attached to a proposal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub user_id: Uuid,
    pub channel: CommentChannel,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        proposal_id: Uuid,
        user_id: Uuid,
        channel: CommentChannel,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            proposal_id,
            user_id,
            channel,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Comment with its author name
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub channel: CommentChannel,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Request to add a comment
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "Comment must be between 1 and 5000 characters"))]
    pub content: String,
    pub channel: CommentChannel,
}

/// Channel selection when listing comments
#[derive(Debug, Deserialize)]
pub struct CommentListQuery {
    pub channel: CommentChannel,
}
