//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::Settings;
use crate::notifications::MailQueue;
use crate::services::{
    CommentService, EventService, ProposalService, ReviewService, TeamService, UserService,
};
use crate::store::Repository;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    pub users: UserService,
    pub teams: TeamService,
    pub events: EventService,
    pub proposals: ProposalService,
    pub reviews: ReviewService,
    pub comments: CommentService,

    /// JWT secret key for token signing
    pub jwt_secret: String,

    /// Serve an allow-all robots.txt
    pub seo_enabled: bool,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn Repository>,
        mail: MailQueue,
        settings: &Settings,
        jwt_secret: String,
    ) -> Self {
        Self {
            users: UserService::new(repo.clone()),
            teams: TeamService::new(repo.clone()),
            events: EventService::new(repo.clone()),
            proposals: ProposalService::new(repo.clone(), mail, settings.mail.clone()),
            reviews: ReviewService::new(repo.clone()),
            comments: CommentService::new(repo),
            jwt_secret,
            seo_enabled: settings.seo_enabled,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
