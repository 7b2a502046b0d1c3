//! Events, CFP settings and the export API

use super::{random_token, slug_taken, team_event, team_membership, users_by_id};
use crate::error::{forbidden_error, not_found_error, validation_error, AppError};
use crate::models::{
    ApiKeyResponse, CreateEventRequest, Event, EventExport, EventResponse, EventType,
    ExportQuery, ExportedProposal, PublicEvent, SpeakerInfo, TeamMember, UpdateEventRequest,
};
use crate::review::ReviewDetails;
use crate::store::Repository;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const API_KEY_LENGTH: usize = 32;

/// Hex SHA-256 digest of an API key
pub fn hash_api_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

fn check_cfp_window(
    event_type: EventType,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if let (EventType::Conference, Some(start), Some(end)) = (event_type, start, end) {
        if start > end {
            return Err(validation_error("CFP start date must be before its end date"));
        }
    }
    Ok(())
}

fn require_event_manager(member: &TeamMember) -> Result<(), AppError> {
    if !member.role.can_manage_event() {
        return Err(forbidden_error("Only owners and members can manage events"));
    }
    Ok(())
}

pub struct EventService {
    repo: Arc<dyn Repository>,
}

impl EventService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn create_event(
        &self,
        user_id: Uuid,
        team_slug: &str,
        request: CreateEventRequest,
    ) -> Result<EventResponse, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        require_event_manager(&member)?;
        check_cfp_window(request.event_type, request.cfp_start, request.cfp_end)?;

        let mut event = Event::new(team.id, request.name.trim(), request.slug.clone(), request.event_type);
        event.description = request.description;
        event.location = request.location;
        event.cfp_start = request.cfp_start;
        event.cfp_end = request.cfp_end;

        let event = self
            .repo
            .create_event(event)
            .await
            .map_err(|e| slug_taken(e, &request.slug))?;

        info!(team = %team.slug, event = %event.slug, "Event created");
        Ok(event.into())
    }

    pub async fn list_team_events(
        &self,
        user_id: Uuid,
        team_slug: &str,
    ) -> Result<Vec<EventResponse>, AppError> {
        let (team, _) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        Ok(self
            .repo
            .list_team_events(team.id)
            .await?
            .into_iter()
            .map(EventResponse::from)
            .collect())
    }

    /// Update general information, CFP dates, review settings or the
    /// archived flag. Absent fields are left unchanged.
    pub async fn update_event(
        &self,
        user_id: Uuid,
        team_slug: &str,
        event_slug: &str,
        update: UpdateEventRequest,
    ) -> Result<EventResponse, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        require_event_manager(&member)?;
        let mut event = team_event(self.repo.as_ref(), &team, event_slug).await?;

        if let Some(name) = update.name {
            event.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            event.description = Some(description);
        }
        if let Some(location) = update.location {
            event.location = Some(location);
        }
        if let Some(start) = update.cfp_start {
            event.cfp_start = Some(start);
        }
        if let Some(end) = update.cfp_end {
            event.cfp_end = Some(end);
        }
        if let Some(max) = update.max_proposals {
            event.max_proposals = Some(max);
        }
        if let Some(flag) = update.review_enabled {
            event.review_enabled = flag;
        }
        if let Some(flag) = update.display_proposals_reviews {
            event.display_proposals_reviews = flag;
        }
        if let Some(flag) = update.display_proposals_speakers {
            event.display_proposals_speakers = flag;
        }
        if let Some(archived) = update.archived {
            if archived != event.archived {
                info!(event = %event.slug, archived, "Event archive state changed");
            }
            event.archived = archived;
        }
        check_cfp_window(event.event_type, event.cfp_start, event.cfp_end)?;
        event.updated_at = Utc::now();

        Ok(self.repo.update_event(event).await?.into())
    }

    /// Replace the export key. The plain key is only returned here.
    pub async fn generate_api_key(
        &self,
        user_id: Uuid,
        team_slug: &str,
        event_slug: &str,
    ) -> Result<ApiKeyResponse, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        require_event_manager(&member)?;
        let mut event = team_event(self.repo.as_ref(), &team, event_slug).await?;

        let api_key = random_token(API_KEY_LENGTH);
        event.api_key_hash = Some(hash_api_key(&api_key));
        event.updated_at = Utc::now();
        self.repo.update_event(event).await?;

        info!(event = %event_slug, "Export API key generated");
        Ok(ApiKeyResponse { api_key })
    }

    /// Public view of an event, as shown to speakers
    pub async fn get_public_event(&self, slug: &str) -> Result<PublicEvent, AppError> {
        let event = self
            .repo
            .find_event_by_slug(slug)
            .await?
            .ok_or_else(|| not_found_error(format!("Event '{}' not found", slug)))?;
        Ok(PublicEvent::from(&event))
    }

    /// Export proposals with speakers and review statistics
    pub async fn export_event(&self, slug: &str, query: ExportQuery) -> Result<EventExport, AppError> {
        let event = self
            .repo
            .find_event_by_slug(slug)
            .await?
            .ok_or_else(|| not_found_error(format!("Event '{}' not found", slug)))?;

        let key = query
            .key
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("API key required".to_string()))?;
        if event.api_key_hash.as_deref() != Some(hash_api_key(key).as_str()) {
            warn!(event = %event.slug, "Rejected export with an invalid API key");
            return Err(AppError::Unauthorized("Invalid API key".to_string()));
        }

        let proposals: Vec<_> = self
            .repo
            .list_event_proposals(event.id)
            .await?
            .into_iter()
            .filter(|p| query.status.map_or(true, |s| p.deliberation.deliberation_status == s))
            .collect();

        let proposal_ids: Vec<Uuid> = proposals.iter().map(|p| p.id).collect();
        let reviews = self.repo.list_reviews(&proposal_ids).await?;
        let speaker_ids: Vec<Uuid> = proposals.iter().flat_map(|p| p.speakers.clone()).collect();
        let users = users_by_id(self.repo.as_ref(), &speaker_ids).await?;

        let proposals = proposals
            .into_iter()
            .map(|p| {
                let ratings: Vec<_> = reviews
                    .iter()
                    .filter(|r| r.proposal_id == p.id)
                    .cloned()
                    .collect();
                ExportedProposal {
                    id: p.id,
                    speakers: p
                        .speakers
                        .iter()
                        .filter_map(|id| users.get(id).map(SpeakerInfo::from))
                        .collect(),
                    reviews: ReviewDetails::new(&ratings).summary(),
                    title: p.title,
                    abstract_text: p.abstract_text,
                    level: p.level,
                    languages: p.languages,
                    deliberation: p.deliberation,
                }
            })
            .collect();

        Ok(EventExport {
            cfp_state: event.cfp_state(),
            name: event.name,
            slug: event.slug,
            event_type: event.event_type,
            proposals,
        })
    }
}
