//! User and speaker profile models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A registered user. Every user can act as a speaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, password_hash: String, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into().trim().to_lowercase(),
            password_hash,
            name: name.into(),
            bio: None,
            company: None,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User response (safe to send to client)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            bio: user.bio.clone(),
            company: user.company.clone(),
            location: user.location.clone(),
        }
    }
}

/// Public speaker information shown to organizers and in exports
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerInfo {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub company: Option<String>,
}

impl From<&User> for SpeakerInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            bio: user.bio.clone(),
            company: user.company.clone(),
        }
    }
}

/// Registration request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request to update the speaker profile
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 5000, message = "Biography is too long"))]
    pub bio: Option<String>,
    #[validate(length(max = 200, message = "Company is too long"))]
    pub company: Option<String>,
    #[validate(length(max = 200, message = "Location is too long"))]
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalizes_email() {
        let user = User::new("  Ada@Example.ORG ", "hash".to_string(), "Ada");
        assert_eq!(user.email, "ada@example.org");
        let body = serde_json::to_value(&user).unwrap();
        assert!(body.get("passwordHash").is_none());
    }

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            email: "ada@example.org".to_string(),
            password: "long enough".to_string(),
            name: "Ada".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short = RegisterRequest {
            password: "short".to_string(),
            ..ok
        };
        assert!(short.validate().is_err());
    }
}
