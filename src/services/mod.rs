//! Business operations
//!
//! Each service owns a handle on the repository and enforces the team
//! permissions before touching data. Handlers stay thin.

pub mod comments;
pub mod events;
pub mod proposals;
pub mod reviews;
pub mod teams;
pub mod users;

pub use comments::CommentService;
pub use events::EventService;
pub use proposals::ProposalService;
pub use reviews::ReviewService;
pub use teams::TeamService;
pub use users::UserService;

use crate::error::{forbidden_error, not_found_error, AppError};
use crate::models::{Event, Proposal, Team, TeamMember, User};
use crate::store::Repository;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use uuid::Uuid;

/// Random alphanumeric token, used for invitation codes and API keys
pub(crate) fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Resolve a team by slug and the caller's membership in it
pub(crate) async fn team_membership(
    repo: &dyn Repository,
    team_slug: &str,
    user_id: Uuid,
) -> Result<(Team, TeamMember), AppError> {
    let team = repo
        .find_team_by_slug(team_slug)
        .await?
        .ok_or_else(|| not_found_error(format!("Team '{}' not found", team_slug)))?;
    let member = repo
        .find_member(team.id, user_id)
        .await?
        .ok_or_else(|| forbidden_error("You are not a member of this team"))?;
    Ok((team, member))
}

/// Resolve an event that must belong to `team`
pub(crate) async fn team_event(
    repo: &dyn Repository,
    team: &Team,
    event_slug: &str,
) -> Result<Event, AppError> {
    repo.find_event_by_slug(event_slug)
        .await?
        .filter(|e| e.team_id == team.id)
        .ok_or_else(|| not_found_error(format!("Event '{}' not found", event_slug)))
}

/// Resolve a proposal that must belong to `event`
pub(crate) async fn event_proposal(
    repo: &dyn Repository,
    event: &Event,
    proposal_id: Uuid,
) -> Result<Proposal, AppError> {
    repo.find_proposal(proposal_id)
        .await?
        .filter(|p| p.event_id == event.id)
        .ok_or_else(|| not_found_error(format!("Proposal {} not found", proposal_id)))
}

/// Load the users behind `ids`, keyed by id
pub(crate) async fn users_by_id(
    repo: &dyn Repository,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, User>, AppError> {
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();
    Ok(repo
        .find_users(&unique)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

/// Map a store conflict on a slug to a validation error
pub(crate) fn slug_taken(err: AppError, slug: &str) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::Validation(format!(
            "This URL ('{}') already exists, please try another one.",
            slug
        )),
        other => other,
    }
}
