//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains the domain records and all request/response structures used by the API.

pub mod comment;
pub mod event;
pub mod proposal;
pub mod review;
pub mod team;
pub mod user;

// Re-export commonly used types
pub use comment::*;
pub use event::*;
pub use proposal::*;
pub use review::*;
pub use team::*;
pub use user::*;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Message-only response (no data)
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("slug pattern is valid"));

/// Validate a URL slug (lowercase letters, digits and dashes)
pub fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if !SLUG_RE.is_match(slug) {
        let mut err = validator::ValidationError::new("invalid_slug");
        err.message = Some(
            "Must only contain lower case alphanumeric and dashes (-).".into(),
        );
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("devfest-nantes-2024").is_ok());
        assert!(validate_slug("Devfest").is_err());
        assert!(validate_slug("dev fest").is_err());
        assert!(validate_slug("dev_fest").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_success_response_shape() {
        let body = serde_json::to_value(SuccessResponse::with_data("ok", 42)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 42);
    }
}
