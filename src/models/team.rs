//! Team and membership models

use crate::error::AppError;
use crate::models::validate_slug;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Role of a user inside an organizing team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamRole {
    /// Manages the team, its members and its events
    Owner,
    /// Manages events, deliberates and publishes results
    Member,
    /// Reviews and comments proposals only
    Reviewer,
}

impl TeamRole {
    pub fn can_manage_team(&self) -> bool {
        matches!(self, TeamRole::Owner)
    }

    pub fn can_manage_event(&self) -> bool {
        matches!(self, TeamRole::Owner | TeamRole::Member)
    }

    pub fn can_deliberate(&self) -> bool {
        matches!(self, TeamRole::Owner | TeamRole::Member)
    }

    pub fn can_review(&self) -> bool {
        true
    }

    /// Owners see every rating even when the event hides them
    pub fn sees_all_reviews(&self) -> bool {
        matches!(self, TeamRole::Owner)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Owner => "OWNER",
            TeamRole::Member => "MEMBER",
            TeamRole::Reviewer => "REVIEWER",
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(TeamRole::Owner),
            "MEMBER" => Ok(TeamRole::Member),
            "REVIEWER" => Ok(TeamRole::Reviewer),
            other => Err(AppError::BadRequest(format!("Unknown team role '{}'", other))),
        }
    }
}

/// An organizing team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing)]
    pub invitation_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, invitation_code: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            invitation_code,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Membership of a user in a team
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn new(team_id: Uuid, user_id: Uuid, role: TeamRole) -> Self {
        Self {
            team_id,
            user_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

/// Team as seen by one of its members
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamWithRole {
    #[serde(flatten)]
    pub team: Team,
    pub role: TeamRole,
    /// Only disclosed to owners
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_code: Option<String>,
}

impl TeamWithRole {
    pub fn new(team: Team, role: TeamRole) -> Self {
        let invitation_code = role
            .can_manage_team()
            .then(|| team.invitation_code.clone());
        Self {
            team,
            role,
            invitation_code,
        }
    }
}

/// Member listing entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

/// Request to create a team
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    #[validate(length(min = 3, max = 50, message = "Team name must be between 3 and 50 characters"))]
    pub name: String,
    #[validate(length(min = 3, max = 50, message = "Team slug must be between 3 and 50 characters"))]
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
}

/// Request to change a member role
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRoleRequest {
    pub role: TeamRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(TeamRole::Owner.can_manage_team());
        assert!(!TeamRole::Member.can_manage_team());
        assert!(TeamRole::Member.can_deliberate());
        assert!(!TeamRole::Reviewer.can_deliberate());
        assert!(!TeamRole::Reviewer.can_manage_event());
        assert!(TeamRole::Reviewer.can_review());
    }

    #[test]
    fn test_invitation_code_only_for_owner() {
        let team = Team::new("GDG Nantes", "gdg-nantes", "abc123".to_string());
        let owner_view = TeamWithRole::new(team.clone(), TeamRole::Owner);
        assert_eq!(owner_view.invitation_code.as_deref(), Some("abc123"));

        let reviewer_view = TeamWithRole::new(team, TeamRole::Reviewer);
        assert!(reviewer_view.invitation_code.is_none());
        let body = serde_json::to_value(&reviewer_view).unwrap();
        assert!(body.get("invitationCode").is_none());
    }

    #[test]
    fn test_create_team_request_validation() {
        let ok = CreateTeamRequest {
            name: "GDG Nantes".to_string(),
            slug: "gdg-nantes".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateTeamRequest {
            name: "GDG Nantes".to_string(),
            slug: "GDG Nantes".to_string(),
        };
        assert!(bad.validate().is_err());
    }
}
