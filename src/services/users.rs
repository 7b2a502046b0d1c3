//! Accounts and speaker profiles

use crate::auth::{hash_password, verify_password};
use crate::error::{not_found_error, AppError};
use crate::models::{RegisterRequest, UpdateProfileRequest, User};
use crate::store::Repository;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct UserService {
    repo: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        let email = request.email.trim().to_lowercase();
        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .repo
            .create_user(User::new(email, password_hash, request.name.trim()))
            .await?;

        info!(user = %user.id, "User registered");
        Ok(user)
    }

    /// Check credentials. Unknown email and wrong password look the same.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());
        let user = self
            .repo
            .find_user_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }
        Ok(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, AppError> {
        self.repo
            .find_user(user_id)
            .await?
            .ok_or_else(|| not_found_error("User not found"))
    }

    /// Update the speaker profile. Absent fields are left unchanged.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> Result<User, AppError> {
        let mut user = self.profile(user_id).await?;
        if let Some(name) = update.name {
            user.name = name.trim().to_string();
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio);
        }
        if let Some(company) = update.company {
            user.company = Some(company);
        }
        if let Some(location) = update.location {
            user.location = Some(location);
        }
        user.updated_at = Utc::now();
        self.repo.update_user(user).await
    }
}
