//! Teams, memberships and invitations

use super::{random_token, slug_taken, team_membership, users_by_id};
use crate::error::{forbidden_error, not_found_error, AppError};
use crate::models::{CreateTeamRequest, MemberResponse, Team, TeamMember, TeamRole, TeamWithRole};
use crate::store::Repository;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const INVITATION_CODE_LENGTH: usize = 24;

pub struct TeamService {
    repo: Arc<dyn Repository>,
}

impl TeamService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Create a team owned by `user_id`. A taken slug is a validation error.
    pub async fn create_team(
        &self,
        user_id: Uuid,
        request: CreateTeamRequest,
    ) -> Result<TeamWithRole, AppError> {
        let team = Team::new(
            request.name.trim(),
            request.slug.clone(),
            random_token(INVITATION_CODE_LENGTH),
        );
        let team = self
            .repo
            .create_team_with_owner(team, user_id)
            .await
            .map_err(|e| slug_taken(e, &request.slug))?;

        info!(team = %team.slug, owner = %user_id, "Team created");
        Ok(TeamWithRole::new(team, TeamRole::Owner))
    }

    pub async fn list_teams(&self, user_id: Uuid) -> Result<Vec<TeamWithRole>, AppError> {
        Ok(self
            .repo
            .list_user_teams(user_id)
            .await?
            .into_iter()
            .map(|(team, role)| TeamWithRole::new(team, role))
            .collect())
    }

    pub async fn get_team(&self, user_id: Uuid, slug: &str) -> Result<TeamWithRole, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), slug, user_id).await?;
        Ok(TeamWithRole::new(team, member.role))
    }

    /// Join a team as reviewer with its invitation code
    pub async fn join_team(&self, user_id: Uuid, code: &str) -> Result<TeamWithRole, AppError> {
        let team = self
            .repo
            .find_team_by_invitation_code(code)
            .await?
            .ok_or(AppError::InvitationInvalid)?;

        if self.repo.find_member(team.id, user_id).await?.is_some() {
            return Err(AppError::InvitationInvalid);
        }

        self.repo
            .add_member(TeamMember::new(team.id, user_id, TeamRole::Reviewer))
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::InvitationInvalid,
                other => other,
            })?;

        info!(team = %team.slug, user = %user_id, "User joined team");
        Ok(TeamWithRole::new(team, TeamRole::Reviewer))
    }

    pub async fn list_members(
        &self,
        user_id: Uuid,
        slug: &str,
    ) -> Result<Vec<MemberResponse>, AppError> {
        let (team, _) = team_membership(self.repo.as_ref(), slug, user_id).await?;
        let members = self.repo.list_members(team.id).await?;
        let ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
        let users = users_by_id(self.repo.as_ref(), &ids).await?;

        Ok(members
            .into_iter()
            .filter_map(|m| {
                users.get(&m.user_id).map(|u| MemberResponse {
                    user_id: u.id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    role: m.role,
                    joined_at: m.joined_at,
                })
            })
            .collect())
    }

    pub async fn change_member_role(
        &self,
        user_id: Uuid,
        slug: &str,
        member_id: Uuid,
        role: TeamRole,
    ) -> Result<TeamMember, AppError> {
        let team = self.require_owner(user_id, slug).await?;
        if member_id == user_id {
            return Err(forbidden_error("You cannot change your own role"));
        }

        let member = self
            .repo
            .update_member_role(team.id, member_id, role)
            .await?
            .ok_or_else(|| not_found_error("Member not found"))?;

        info!(team = %team.slug, member = %member_id, role = %role, "Member role changed");
        Ok(member)
    }

    pub async fn remove_member(
        &self,
        user_id: Uuid,
        slug: &str,
        member_id: Uuid,
    ) -> Result<(), AppError> {
        let team = self.require_owner(user_id, slug).await?;
        if member_id == user_id {
            return Err(forbidden_error("You cannot remove yourself from the team"));
        }
        if !self.repo.remove_member(team.id, member_id).await? {
            return Err(not_found_error("Member not found"));
        }
        info!(team = %team.slug, member = %member_id, "Member removed");
        Ok(())
    }

    /// Leave a team. Owners cannot leave.
    pub async fn leave_team(&self, user_id: Uuid, slug: &str) -> Result<(), AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), slug, user_id).await?;
        if member.role == TeamRole::Owner {
            return Err(forbidden_error("An owner cannot leave the team"));
        }
        self.repo.remove_member(team.id, user_id).await?;
        debug!(team = %team.slug, user = %user_id, "User left team");
        Ok(())
    }

    async fn require_owner(&self, user_id: Uuid, slug: &str) -> Result<Team, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), slug, user_id).await?;
        if !member.role.can_manage_team() {
            return Err(forbidden_error("Only team owners can manage members"));
        }
        Ok(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{user, world};
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_duplicate_slug_is_validation_error() {
        let w = world().await;
        let err = TeamService::new(w.repo.clone())
            .create_team(
                w.owner.id,
                CreateTeamRequest {
                    name: "Another".to_string(),
                    slug: "gdg-nantes".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_join_with_invitation_code() {
        let w = world().await;
        let service = TeamService::new(w.repo.clone());
        let ada = user(w.repo.as_ref(), "ada").await;
        let code = w.team.invitation_code.clone().unwrap();

        let joined = service.join_team(ada.id, &code).await.unwrap();
        assert_eq!(joined.role, TeamRole::Reviewer);
        assert!(joined.invitation_code.is_none());

        let again = service.join_team(ada.id, &code).await.unwrap_err();
        assert!(matches!(again, AppError::InvitationInvalid));
    }

    #[tokio::test]
    async fn test_join_with_unknown_code() {
        let w = world().await;
        let ada = user(w.repo.as_ref(), "ada").await;
        let err = TeamService::new(w.repo.clone())
            .join_team(ada.id, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvitationInvalid));
    }

    #[tokio::test]
    async fn test_only_owner_manages_members() {
        let w = world().await;
        let service = TeamService::new(w.repo.clone());
        let member = w.member("bob", TeamRole::Member).await;
        let reviewer = w.member("rita", TeamRole::Reviewer).await;

        assert_err!(
            service
                .change_member_role(member.id, "gdg-nantes", reviewer.id, TeamRole::Member)
                .await
        );
        let updated = service
            .change_member_role(w.owner.id, "gdg-nantes", reviewer.id, TeamRole::Member)
            .await
            .unwrap();
        assert_eq!(updated.role, TeamRole::Member);

        assert_ok!(service.remove_member(w.owner.id, "gdg-nantes", member.id).await);
        let members = service.list_members(w.owner.id, "gdg-nantes").await.unwrap();
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn test_owner_cannot_remove_or_demote_self() {
        let w = world().await;
        let service = TeamService::new(w.repo.clone());
        assert_err!(service.remove_member(w.owner.id, "gdg-nantes", w.owner.id).await);
        assert_err!(
            service
                .change_member_role(w.owner.id, "gdg-nantes", w.owner.id, TeamRole::Reviewer)
                .await
        );
        assert_err!(service.leave_team(w.owner.id, "gdg-nantes").await);
    }

    #[tokio::test]
    async fn test_leave_team() {
        let w = world().await;
        let service = TeamService::new(w.repo.clone());
        let reviewer = w.member("rita", TeamRole::Reviewer).await;

        assert_ok!(service.leave_team(reviewer.id, "gdg-nantes").await);
        let err = service.get_team(reviewer.id, "gdg-nantes").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
