//! Persistence layer
//!
//! The `Repository` trait abstracts storage of every aggregate so that the
//! services can run against PostgreSQL in production and against the
//! in-memory store in development and tests.

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

use crate::deliberation::DeliberationState;
use crate::error::AppError;
use crate::models::{Comment, CommentChannel, Event, Proposal, Review, Team, TeamMember, TeamRole, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage operations used by the services.
///
/// Unique keys (user email, team slug, event slug, one membership per
/// user and team, one review per user and proposal) are enforced by the
/// implementation and reported as `AppError::Conflict`.
#[async_trait]
pub trait Repository: Send + Sync {
    // Users
    async fn create_user(&self, user: User) -> Result<User, AppError>;
    async fn update_user(&self, user: User) -> Result<User, AppError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError>;

    // Teams
    /// Create the team and its owning membership atomically
    async fn create_team_with_owner(&self, team: Team, owner_id: Uuid) -> Result<Team, AppError>;
    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, AppError>;
    async fn find_team_by_slug(&self, slug: &str) -> Result<Option<Team>, AppError>;
    async fn find_team_by_invitation_code(&self, code: &str) -> Result<Option<Team>, AppError>;
    async fn list_user_teams(&self, user_id: Uuid) -> Result<Vec<(Team, TeamRole)>, AppError>;

    // Members
    async fn add_member(&self, member: TeamMember) -> Result<TeamMember, AppError>;
    async fn find_member(&self, team_id: Uuid, user_id: Uuid) -> Result<Option<TeamMember>, AppError>;
    async fn list_members(&self, team_id: Uuid) -> Result<Vec<TeamMember>, AppError>;
    async fn update_member_role(&self, team_id: Uuid, user_id: Uuid, role: TeamRole) -> Result<Option<TeamMember>, AppError>;
    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    // Events
    async fn create_event(&self, event: Event) -> Result<Event, AppError>;
    async fn update_event(&self, event: Event) -> Result<Event, AppError>;
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, AppError>;
    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, AppError>;
    async fn list_team_events(&self, team_id: Uuid) -> Result<Vec<Event>, AppError>;

    // Proposals
    async fn create_proposal(&self, proposal: Proposal) -> Result<Proposal, AppError>;
    /// Write the speaker-editable fields of a proposal that is still PENDING.
    /// Status columns are left untouched. `None` when the proposal is missing
    /// or was deliberated in the meantime.
    async fn update_pending_proposal(&self, proposal: Proposal) -> Result<Option<Proposal>, AppError>;
    /// Write the statuses of `proposal` only if the stored ones still equal
    /// `expected`. `None` when another write changed them first.
    async fn transition_proposal(
        &self,
        expected: DeliberationState,
        proposal: Proposal,
    ) -> Result<Option<Proposal>, AppError>;
    /// Apply several transitions in one transaction. Stale ones are skipped
    /// and left out of the returned list.
    async fn transition_proposals(
        &self,
        transitions: Vec<(DeliberationState, Proposal)>,
    ) -> Result<Vec<Proposal>, AppError>;
    /// Delete a proposal that is still PENDING, with its reviews and comments
    async fn delete_pending_proposal(&self, id: Uuid) -> Result<bool, AppError>;
    async fn find_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError>;
    async fn list_event_proposals(&self, event_id: Uuid) -> Result<Vec<Proposal>, AppError>;
    async fn list_speaker_proposals(&self, user_id: Uuid) -> Result<Vec<Proposal>, AppError>;

    // Reviews
    /// Insert or replace the review of `(review.user_id, review.proposal_id)`
    async fn upsert_review(&self, review: Review) -> Result<Review, AppError>;
    async fn list_reviews(&self, proposal_ids: &[Uuid]) -> Result<Vec<Review>, AppError>;

    // Comments
    async fn add_comment(&self, comment: Comment) -> Result<Comment, AppError>;
    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError>;
    async fn list_comments(&self, proposal_id: Uuid, channel: CommentChannel) -> Result<Vec<Comment>, AppError>;
    async fn delete_comment(&self, id: Uuid) -> Result<bool, AppError>;
}
