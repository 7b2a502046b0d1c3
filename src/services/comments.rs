//! Proposal comments
//!
//! `ORGANIZER` comments are internal to the team. `SPEAKER` comments are
//! a conversation open to the team and the proposal's speakers.

use super::users_by_id;
use crate::error::{forbidden_error, not_found_error, AppError};
use crate::models::{AddCommentRequest, Comment, CommentChannel, CommentView, Proposal};
use crate::store::Repository;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct CommentService {
    repo: Arc<dyn Repository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn add_comment(
        &self,
        user_id: Uuid,
        proposal_id: Uuid,
        request: AddCommentRequest,
    ) -> Result<CommentView, AppError> {
        let proposal = self.accessible_proposal(user_id, proposal_id, request.channel).await?;
        let comment = self
            .repo
            .add_comment(Comment::new(
                proposal.id,
                user_id,
                request.channel,
                request.content.trim(),
            ))
            .await?;

        debug!(proposal = %proposal_id, channel = comment.channel.as_str(), "Comment added");
        let mut views = self.views(vec![comment]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("Comment author not found".to_string()))
    }

    /// Comments of one channel, oldest first
    pub async fn list_comments(
        &self,
        user_id: Uuid,
        proposal_id: Uuid,
        channel: CommentChannel,
    ) -> Result<Vec<CommentView>, AppError> {
        let proposal = self.accessible_proposal(user_id, proposal_id, channel).await?;
        let comments = self.repo.list_comments(proposal.id, channel).await?;
        self.views(comments).await
    }

    /// Delete a comment. Only its author may do so.
    pub async fn remove_comment(
        &self,
        user_id: Uuid,
        proposal_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), AppError> {
        let comment = self
            .repo
            .find_comment(comment_id)
            .await?
            .filter(|c| c.proposal_id == proposal_id)
            .ok_or_else(|| not_found_error("Comment not found"))?;

        if comment.user_id != user_id {
            return Err(forbidden_error("Only the author can remove a comment"));
        }
        self.repo.delete_comment(comment.id).await?;
        debug!(comment = %comment_id, "Comment removed");
        Ok(())
    }

    async fn accessible_proposal(
        &self,
        user_id: Uuid,
        proposal_id: Uuid,
        channel: CommentChannel,
    ) -> Result<Proposal, AppError> {
        let proposal = self
            .repo
            .find_proposal(proposal_id)
            .await?
            .ok_or_else(|| not_found_error(format!("Proposal {} not found", proposal_id)))?;
        let event = self
            .repo
            .find_event(proposal.event_id)
            .await?
            .ok_or_else(|| not_found_error("Event not found"))?;

        let is_member = self.repo.find_member(event.team_id, user_id).await?.is_some();
        let allowed = match channel {
            CommentChannel::Organizer => is_member,
            CommentChannel::Speaker => is_member || proposal.is_speaker(user_id),
        };
        if !allowed {
            return Err(forbidden_error("You cannot access the comments of this proposal"));
        }
        Ok(proposal)
    }

    async fn views(&self, comments: Vec<Comment>) -> Result<Vec<CommentView>, AppError> {
        let ids: Vec<Uuid> = comments.iter().map(|c| c.user_id).collect();
        let users = users_by_id(self.repo.as_ref(), &ids).await?;
        Ok(comments
            .into_iter()
            .filter_map(|c| {
                users.get(&c.user_id).map(|u| CommentView {
                    id: c.id,
                    user_id: c.user_id,
                    user_name: u.name.clone(),
                    channel: c.channel,
                    content: c.content,
                    created_at: c.created_at,
                })
            })
            .collect())
    }
}
