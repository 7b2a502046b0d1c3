//! Review (rating) models

use crate::error::AppError;
use crate::review::ReviewSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Qualitative sentiment accompanying a rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feeling {
    Positive,
    Negative,
    Neutral,
    NoOpinion,
}

impl Feeling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feeling::Positive => "POSITIVE",
            Feeling::Negative => "NEGATIVE",
            Feeling::Neutral => "NEUTRAL",
            Feeling::NoOpinion => "NO_OPINION",
        }
    }
}

impl FromStr for Feeling {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POSITIVE" => Ok(Feeling::Positive),
            "NEGATIVE" => Ok(Feeling::Negative),
            "NEUTRAL" => Ok(Feeling::Neutral),
            "NO_OPINION" => Ok(Feeling::NoOpinion),
            other => Err(AppError::BadRequest(format!("Unknown feeling '{}'", other))),
        }
    }
}

/// One reviewer's rating of one proposal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub user_id: Uuid,
    pub feeling: Feeling,
    pub score: Option<i32>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(proposal_id: Uuid, user_id: Uuid, feeling: Feeling, score: Option<i32>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            proposal_id,
            user_id,
            feeling,
            score,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to rate a proposal
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub feeling: Feeling,
    #[validate(range(min = 0, max = 5, message = "Score must be between 0 and 5"))]
    pub score: Option<i32>,
    #[validate(length(max = 2000, message = "Note is too long"))]
    pub note: Option<String>,
}

/// A rating with its author, for the review panel
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub user_id: Uuid,
    pub user_name: String,
    pub feeling: Feeling,
    pub score: Option<i32>,
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Review panel of a proposal
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetailsResponse {
    pub summary: ReviewSummary,
    pub user_review: Option<Review>,
    /// Empty unless the event displays ratings to the caller
    pub reviews: Vec<ReviewView>,
}
