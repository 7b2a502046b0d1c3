//! Event models and call-for-papers state

use crate::error::AppError;
use crate::models::validate_slug;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Kind of event. Meetups keep their CFP open once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Conference,
    Meetup,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Conference => "CONFERENCE",
            EventType::Meetup => "MEETUP",
        }
    }
}

impl FromStr for EventType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFERENCE" => Ok(EventType::Conference),
            "MEETUP" => Ok(EventType::Meetup),
            other => Err(AppError::BadRequest(format!("Unknown event type '{}'", other))),
        }
    }
}

/// State of the call for papers at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CfpState {
    Closed,
    Opened,
    Finished,
}

/// A conference or meetup owned by a team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub cfp_start: Option<DateTime<Utc>>,
    pub cfp_end: Option<DateTime<Utc>>,
    pub max_proposals: Option<i32>,
    pub review_enabled: bool,
    pub display_proposals_reviews: bool,
    pub display_proposals_speakers: bool,
    /// SHA-256 digest of the export API key
    #[serde(skip_serializing)]
    pub api_key_hash: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        team_id: Uuid,
        name: impl Into<String>,
        slug: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            team_id,
            name: name.into(),
            slug: slug.into(),
            event_type,
            description: None,
            location: None,
            cfp_start: None,
            cfp_end: None,
            max_proposals: None,
            review_enabled: true,
            display_proposals_reviews: true,
            display_proposals_speakers: true,
            api_key_hash: None,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// CFP state at `now`
    pub fn cfp_state_at(&self, now: DateTime<Utc>) -> CfpState {
        if self.archived {
            return CfpState::Closed;
        }
        match (self.event_type, self.cfp_start, self.cfp_end) {
            (EventType::Meetup, Some(start), _) if now >= start => CfpState::Opened,
            (EventType::Meetup, _, _) => CfpState::Closed,
            (EventType::Conference, Some(start), Some(end)) => {
                if now < start {
                    CfpState::Closed
                } else if now <= end {
                    CfpState::Opened
                } else {
                    CfpState::Finished
                }
            }
            (EventType::Conference, _, _) => CfpState::Closed,
        }
    }

    pub fn cfp_state(&self) -> CfpState {
        self.cfp_state_at(Utc::now())
    }

    pub fn is_cfp_open(&self) -> bool {
        self.cfp_state() == CfpState::Opened
    }
}

/// Event as returned to its team
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub cfp_state: CfpState,
    pub has_api_key: bool,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            cfp_state: event.cfp_state(),
            has_api_key: event.api_key_hash.is_some(),
            event,
        }
    }
}

/// Event as shown to speakers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicEvent {
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub cfp_start: Option<DateTime<Utc>>,
    pub cfp_end: Option<DateTime<Utc>>,
    pub cfp_state: CfpState,
    pub max_proposals: Option<i32>,
}

impl From<&Event> for PublicEvent {
    fn from(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            slug: event.slug.clone(),
            event_type: event.event_type,
            description: event.description.clone(),
            location: event.location.clone(),
            cfp_start: event.cfp_start,
            cfp_end: event.cfp_end,
            cfp_state: event.cfp_state(),
            max_proposals: event.max_proposals,
        }
    }
}

/// Request to create an event
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 3, max = 100, message = "Event name must be between 3 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 3, max = 100, message = "Event slug must be between 3 and 100 characters"))]
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    pub location: Option<String>,
    pub cfp_start: Option<DateTime<Utc>>,
    pub cfp_end: Option<DateTime<Utc>>,
}

/// Request to update an event. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 3, max = 100, message = "Event name must be between 3 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    pub location: Option<String>,
    pub cfp_start: Option<DateTime<Utc>>,
    pub cfp_end: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "Maximum proposals must be at least 1"))]
    pub max_proposals: Option<i32>,
    pub review_enabled: Option<bool>,
    pub display_proposals_reviews: Option<bool>,
    pub display_proposals_speakers: Option<bool>,
    pub archived: Option<bool>,
}

/// Freshly generated export key, shown once
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn conference() -> Event {
        Event::new(Uuid::new_v4(), "Devfest", "devfest", EventType::Conference)
    }

    #[test]
    fn test_conference_cfp_window() {
        let now = Utc::now();
        let mut event = conference();
        assert_eq!(event.cfp_state_at(now), CfpState::Closed);

        event.cfp_start = Some(now - Duration::days(1));
        event.cfp_end = Some(now + Duration::days(1));
        assert_eq!(event.cfp_state_at(now), CfpState::Opened);
        assert_eq!(event.cfp_state_at(now - Duration::days(2)), CfpState::Closed);
        assert_eq!(event.cfp_state_at(now + Duration::days(2)), CfpState::Finished);
    }

    #[test]
    fn test_meetup_cfp_never_finishes() {
        let now = Utc::now();
        let mut event = Event::new(Uuid::new_v4(), "Meetup", "meetup", EventType::Meetup);
        assert_eq!(event.cfp_state_at(now), CfpState::Closed);

        event.cfp_start = Some(now - Duration::days(30));
        assert_eq!(event.cfp_state_at(now + Duration::days(365)), CfpState::Opened);
    }

    #[test]
    fn test_archived_event_is_closed() {
        let now = Utc::now();
        let mut event = conference();
        event.cfp_start = Some(now - Duration::days(1));
        event.cfp_end = Some(now + Duration::days(1));
        event.archived = true;
        assert_eq!(event.cfp_state_at(now), CfpState::Closed);
    }

    #[test]
    fn test_api_key_hash_is_never_serialized() {
        let mut event = conference();
        event.api_key_hash = Some("digest".to_string());
        let body = serde_json::to_value(EventResponse::from(event)).unwrap();
        assert!(body.get("apiKeyHash").is_none());
        assert_eq!(body["hasApiKey"], true);
        assert_eq!(body["type"], "CONFERENCE");
    }
}
