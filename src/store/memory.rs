//! In-memory repository
//!
//! All records live in a single `Tables` value behind one `RwLock`, so
//! multi-record writes are atomic. State is lost on restart.

use super::Repository;
use crate::deliberation::{DeliberationState, DeliberationStatus};
use crate::error::AppError;
use crate::models::{Comment, CommentChannel, Event, Proposal, Review, Team, TeamMember, TeamRole, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    members: HashMap<(Uuid, Uuid), TeamMember>,
    events: HashMap<Uuid, Event>,
    proposals: HashMap<Uuid, Proposal>,
    /// Keyed by (user, proposal)
    reviews: HashMap<(Uuid, Uuid), Review>,
    comments: HashMap<Uuid, Comment>,
}

/// Thread-safe in-memory store
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: User) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn create_team_with_owner(&self, team: Team, owner_id: Uuid) -> Result<Team, AppError> {
        let mut tables = self.tables.write().await;
        if tables.teams.values().any(|t| t.slug == team.slug) {
            return Err(AppError::Conflict(format!("Team slug '{}' already exists", team.slug)));
        }
        tables.members.insert(
            (team.id, owner_id),
            TeamMember::new(team.id, owner_id, TeamRole::Owner),
        );
        tables.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, AppError> {
        Ok(self.tables.read().await.teams.get(&id).cloned())
    }

    async fn find_team_by_slug(&self, slug: &str) -> Result<Option<Team>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.teams.values().find(|t| t.slug == slug).cloned())
    }

    async fn find_team_by_invitation_code(&self, code: &str) -> Result<Option<Team>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.teams.values().find(|t| t.invitation_code == code).cloned())
    }

    async fn list_user_teams(&self, user_id: Uuid) -> Result<Vec<(Team, TeamRole)>, AppError> {
        let tables = self.tables.read().await;
        let mut teams: Vec<(Team, TeamRole)> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.teams.get(&m.team_id).map(|t| (t.clone(), m.role)))
            .collect();
        teams.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(teams)
    }

    async fn add_member(&self, member: TeamMember) -> Result<TeamMember, AppError> {
        let mut tables = self.tables.write().await;
        let key = (member.team_id, member.user_id);
        if tables.members.contains_key(&key) {
            return Err(AppError::Conflict("User is already a member of this team".to_string()));
        }
        tables.members.insert(key, member.clone());
        Ok(member)
    }

    async fn find_member(&self, team_id: Uuid, user_id: Uuid) -> Result<Option<TeamMember>, AppError> {
        Ok(self.tables.read().await.members.get(&(team_id, user_id)).cloned())
    }

    async fn list_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, AppError> {
        let tables = self.tables.read().await;
        let mut members: Vec<TeamMember> = tables
            .members
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn update_member_role(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> Result<Option<TeamMember>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.members.get_mut(&(team_id, user_id)).map(|m| {
            m.role = role;
            m.clone()
        }))
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.members.remove(&(team_id, user_id)).is_some())
    }

    async fn create_event(&self, event: Event) -> Result<Event, AppError> {
        let mut tables = self.tables.write().await;
        if tables.events.values().any(|e| e.slug == event.slug) {
            return Err(AppError::Conflict(format!("Event slug '{}' already exists", event.slug)));
        }
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_event(&self, event: Event) -> Result<Event, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event.id) {
            return Err(AppError::NotFound(format!("Event {} not found", event.id)));
        }
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.events.values().find(|e| e.slug == slug).cloned())
    }

    async fn list_team_events(&self, team_id: Uuid) -> Result<Vec<Event>, AppError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.team_id == team_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn create_proposal(&self, proposal: Proposal) -> Result<Proposal, AppError> {
        let mut tables = self.tables.write().await;
        tables.proposals.insert(proposal.id, proposal.clone());
        Ok(proposal)
    }

    async fn update_pending_proposal(&self, proposal: Proposal) -> Result<Option<Proposal>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.proposals.get_mut(&proposal.id) else {
            return Ok(None);
        };
        if current.deliberation.deliberation_status != DeliberationStatus::Pending {
            return Ok(None);
        }
        current.title = proposal.title;
        current.abstract_text = proposal.abstract_text;
        current.level = proposal.level;
        current.languages = proposal.languages;
        current.references = proposal.references;
        current.speakers = proposal.speakers;
        current.updated_at = proposal.updated_at;
        Ok(Some(current.clone()))
    }

    async fn transition_proposal(
        &self,
        expected: DeliberationState,
        proposal: Proposal,
    ) -> Result<Option<Proposal>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(apply_transition(&mut tables, expected, &proposal))
    }

    async fn transition_proposals(
        &self,
        transitions: Vec<(DeliberationState, Proposal)>,
    ) -> Result<Vec<Proposal>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(transitions
            .iter()
            .filter_map(|(expected, proposal)| apply_transition(&mut tables, *expected, proposal))
            .collect())
    }

    async fn delete_pending_proposal(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let pending = tables
            .proposals
            .get(&id)
            .is_some_and(|p| p.deliberation.deliberation_status == DeliberationStatus::Pending);
        if pending {
            tables.proposals.remove(&id);
            tables.reviews.retain(|(_, proposal_id), _| *proposal_id != id);
            tables.comments.retain(|_, c| c.proposal_id != id);
        }
        Ok(pending)
    }

    async fn find_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError> {
        Ok(self.tables.read().await.proposals.get(&id).cloned())
    }

    async fn list_event_proposals(&self, event_id: Uuid) -> Result<Vec<Proposal>, AppError> {
        let tables = self.tables.read().await;
        let mut proposals: Vec<Proposal> = tables
            .proposals
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    async fn list_speaker_proposals(&self, user_id: Uuid) -> Result<Vec<Proposal>, AppError> {
        let tables = self.tables.read().await;
        let mut proposals: Vec<Proposal> = tables
            .proposals
            .values()
            .filter(|p| p.is_speaker(user_id))
            .cloned()
            .collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    async fn upsert_review(&self, review: Review) -> Result<Review, AppError> {
        let mut tables = self.tables.write().await;
        let key = (review.user_id, review.proposal_id);
        let stored = match tables.reviews.get(&key) {
            Some(existing) => Review {
                id: existing.id,
                created_at: existing.created_at,
                updated_at: Utc::now(),
                ..review
            },
            None => review,
        };
        tables.reviews.insert(key, stored.clone());
        Ok(stored)
    }

    async fn list_reviews(&self, proposal_ids: &[Uuid]) -> Result<Vec<Review>, AppError> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| proposal_ids.contains(&r.proposal_id))
            .cloned()
            .collect();
        reviews.sort_by_key(|r| r.created_at);
        Ok(reviews)
    }

    async fn add_comment(&self, comment: Comment) -> Result<Comment, AppError> {
        let mut tables = self.tables.write().await;
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(
        &self,
        proposal_id: Uuid,
        channel: CommentChannel,
    ) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.proposal_id == proposal_id && c.channel == channel)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }
}

/// Copy the statuses of `proposal` over the stored ones if those still equal `expected`
fn apply_transition(
    tables: &mut Tables,
    expected: DeliberationState,
    proposal: &Proposal,
) -> Option<Proposal> {
    let current = tables.proposals.get_mut(&proposal.id)?;
    if current.deliberation != expected {
        return None;
    }
    current.deliberation = proposal.deliberation;
    current.updated_at = proposal.updated_at;
    Some(current.clone())
}
