//! Proposal ratings

use super::{event_proposal, team_event, team_membership, users_by_id};
use crate::error::{forbidden_error, AppError};
use crate::models::{Feeling, RateRequest, Review, ReviewDetailsResponse, ReviewView};
use crate::review::ReviewDetails;
use crate::store::Repository;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct ReviewService {
    repo: Arc<dyn Repository>,
}

impl ReviewService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Rate a proposal, replacing the caller's previous rating.
    /// `NO_OPINION` never carries a score.
    pub async fn rate(
        &self,
        user_id: Uuid,
        team_slug: &str,
        event_slug: &str,
        proposal_id: Uuid,
        request: RateRequest,
    ) -> Result<Review, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        if !member.role.can_review() {
            return Err(forbidden_error("You cannot review proposals of this team"));
        }
        let event = team_event(self.repo.as_ref(), &team, event_slug).await?;
        if !event.review_enabled {
            return Err(forbidden_error("Reviews are disabled for this event"));
        }
        let proposal = event_proposal(self.repo.as_ref(), &event, proposal_id).await?;

        let score = match request.feeling {
            Feeling::NoOpinion => None,
            _ => request.score,
        };
        let mut review = Review::new(proposal.id, user_id, request.feeling, score);
        review.note = request.note.filter(|n| !n.trim().is_empty());

        let review = self.repo.upsert_review(review).await?;
        debug!(proposal = %proposal_id, user = %user_id, feeling = review.feeling.as_str(), "Proposal rated");
        Ok(review)
    }

    /// Statistics, the caller's rating, and everyone's ratings when the
    /// event displays them (owners always see them)
    pub async fn review_details(
        &self,
        user_id: Uuid,
        team_slug: &str,
        event_slug: &str,
        proposal_id: Uuid,
    ) -> Result<ReviewDetailsResponse, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        let event = team_event(self.repo.as_ref(), &team, event_slug).await?;
        let proposal = event_proposal(self.repo.as_ref(), &event, proposal_id).await?;

        let reviews = self.repo.list_reviews(&[proposal.id]).await?;
        let details = ReviewDetails::new(&reviews);

        let visible = event.display_proposals_reviews || member.role.sees_all_reviews();
        let views = if visible {
            let ids: Vec<Uuid> = reviews.iter().map(|r| r.user_id).collect();
            let users = users_by_id(self.repo.as_ref(), &ids).await?;
            reviews
                .iter()
                .map(|r| ReviewView {
                    user_id: r.user_id,
                    user_name: users
                        .get(&r.user_id)
                        .map(|u| u.name.clone())
                        .unwrap_or_default(),
                    feeling: r.feeling,
                    score: r.score,
                    note: r.note.clone(),
                    updated_at: r.updated_at,
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(ReviewDetailsResponse {
            summary: details.summary(),
            user_review: details.from_user(user_id).cloned(),
            reviews: views,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Proposal, SubmitProposalRequest, TeamRole, UpdateEventRequest};
    use crate::services::fixtures::{user, world, World};
    use crate::services::EventService;
    use pretty_assertions::assert_eq;

    async fn proposal(w: &World) -> Proposal {
        let request = SubmitProposalRequest {
            title: "Talk".to_string(),
            abstract_text: "Abstract".to_string(),
            level: None,
            languages: vec![],
            references: None,
        };
        w.repo
            .create_proposal(Proposal::new(w.event.id, w.owner.id, request))
            .await
            .unwrap()
    }

    fn rating(feeling: Feeling, score: Option<i32>) -> RateRequest {
        RateRequest {
            feeling,
            score,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_rate_upserts_one_per_user() {
        let w = world().await;
        let service = ReviewService::new(w.repo.clone());
        let p = proposal(&w).await;
        let reviewer = w.member("rita", TeamRole::Reviewer).await;

        service
            .rate(reviewer.id, "gdg-nantes", "devfest", p.id, rating(Feeling::Negative, Some(1)))
            .await
            .unwrap();
        service
            .rate(reviewer.id, "gdg-nantes", "devfest", p.id, rating(Feeling::Positive, Some(4)))
            .await
            .unwrap();
        service
            .rate(w.owner.id, "gdg-nantes", "devfest", p.id, rating(Feeling::Positive, Some(2)))
            .await
            .unwrap();

        let details = service
            .review_details(reviewer.id, "gdg-nantes", "devfest", p.id)
            .await
            .unwrap();
        assert_eq!(details.reviews.len(), 2);
        assert_eq!(details.summary.positives, 2);
        assert_eq!(details.summary.negatives, 0);
        assert_eq!(details.summary.average, Some(3.0));
        assert_eq!(details.user_review.unwrap().score, Some(4));
    }

    #[tokio::test]
    async fn test_non_member_cannot_rate() {
        let w = world().await;
        let p = proposal(&w).await;
        let outsider = user(w.repo.as_ref(), "outsider").await;
        let err = ReviewService::new(w.repo.clone())
            .rate(outsider.id, "gdg-nantes", "devfest", p.id, rating(Feeling::Positive, Some(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_no_opinion_drops_score() {
        let w = world().await;
        let p = proposal(&w).await;
        let review = ReviewService::new(w.repo.clone())
            .rate(w.owner.id, "gdg-nantes", "devfest", p.id, rating(Feeling::NoOpinion, Some(5)))
            .await
            .unwrap();
        assert_eq!(review.score, None);
    }

    #[tokio::test]
    async fn test_disabled_reviews_and_hidden_ratings() {
        let w = world().await;
        let service = ReviewService::new(w.repo.clone());
        let p = proposal(&w).await;
        let reviewer = w.member("rita", TeamRole::Reviewer).await;
        service
            .rate(reviewer.id, "gdg-nantes", "devfest", p.id, rating(Feeling::Neutral, Some(3)))
            .await
            .unwrap();

        EventService::new(w.repo.clone())
            .update_event(
                w.owner.id,
                "gdg-nantes",
                "devfest",
                UpdateEventRequest {
                    review_enabled: Some(false),
                    display_proposals_reviews: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = service
            .rate(reviewer.id, "gdg-nantes", "devfest", p.id, rating(Feeling::Positive, Some(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let hidden = service
            .review_details(reviewer.id, "gdg-nantes", "devfest", p.id)
            .await
            .unwrap();
        assert!(hidden.reviews.is_empty());
        assert!(hidden.user_review.is_some());

        let owner_view = service
            .review_details(w.owner.id, "gdg-nantes", "devfest", p.id)
            .await
            .unwrap();
        assert_eq!(owner_view.reviews.len(), 1);
    }
}
