//! Proposal submission, organizer listing and deliberation

use super::{event_proposal, team_event, team_membership, users_by_id};
use crate::config::MailConfig;
use crate::deliberation::{
    ConfirmationStatus, Decision, DeliberationState, DeliberationStatus, SpeakerAnswer,
    TransitionError,
};
use crate::error::{forbidden_error, not_found_error, AppError};
use crate::models::{
    NotificationKind, OwnRating, Proposal, ProposalListQuery, ProposalPage, ProposalSummary,
    PublicationRequest, PublicationResult, Review, ReviewFilter, SortOrder, SpeakerInfo,
    SpeakerNotification, SpeakerProposal, StatusFilter, SubmitProposalRequest,
    UpdateProposalRequest,
};
use crate::notifications::{publication_messages, spawn_campaign, MailQueue};
use crate::review::ReviewDetails;
use crate::store::Repository;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

fn matches_status(state: &DeliberationState, filter: StatusFilter) -> bool {
    match filter {
        StatusFilter::Pending => state.deliberation_status == DeliberationStatus::Pending,
        StatusFilter::Accepted => state.deliberation_status == DeliberationStatus::Accepted,
        StatusFilter::Rejected => state.deliberation_status == DeliberationStatus::Rejected,
        StatusFilter::NotAnswered => state.awaits_confirmation(),
        StatusFilter::Confirmed => state.confirmation_status == Some(ConfirmationStatus::Confirmed),
        StatusFilter::Declined => state.confirmation_status == Some(ConfirmationStatus::Declined),
    }
}

/// Averages compare numerically; proposals without one always sort last
fn compare_averages(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.total_cmp(&a),
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct ProposalService {
    repo: Arc<dyn Repository>,
    mail: MailQueue,
    mail_config: MailConfig,
}

impl ProposalService {
    pub fn new(repo: Arc<dyn Repository>, mail: MailQueue, mail_config: MailConfig) -> Self {
        Self {
            repo,
            mail,
            mail_config,
        }
    }

    // ------------------------------------------------------------------
    // Speaker side
    // ------------------------------------------------------------------

    /// Submit a proposal while the event CFP is open
    pub async fn submit(
        &self,
        user_id: Uuid,
        event_slug: &str,
        request: SubmitProposalRequest,
    ) -> Result<Proposal, AppError> {
        let event = self
            .repo
            .find_event_by_slug(event_slug)
            .await?
            .ok_or_else(|| not_found_error(format!("Event '{}' not found", event_slug)))?;

        if !event.is_cfp_open() {
            return Err(forbidden_error("The call for papers is not open"));
        }

        if let Some(max) = event.max_proposals {
            let submitted = self
                .repo
                .list_speaker_proposals(user_id)
                .await?
                .iter()
                .filter(|p| p.event_id == event.id)
                .count();
            if submitted as i64 >= i64::from(max) {
                return Err(forbidden_error(format!(
                    "You can submit at most {} proposals to this event",
                    max
                )));
            }
        }

        let proposal = self
            .repo
            .create_proposal(Proposal::new(event.id, user_id, request))
            .await?;
        info!(event = %event.slug, proposal = %proposal.id, "Proposal submitted");
        Ok(proposal)
    }

    /// Edit a proposal. Only while the CFP is open and no decision was made.
    pub async fn update(
        &self,
        user_id: Uuid,
        proposal_id: Uuid,
        update: UpdateProposalRequest,
    ) -> Result<Proposal, AppError> {
        let mut proposal = self.editable_proposal(user_id, proposal_id).await?;
        proposal.apply(update);
        self.repo
            .update_pending_proposal(proposal)
            .await?
            .ok_or_else(|| forbidden_error("The proposal has already been deliberated"))
    }

    /// Withdraw (delete) a proposal, with the same rules as editing
    pub async fn withdraw(&self, user_id: Uuid, proposal_id: Uuid) -> Result<(), AppError> {
        let proposal = self.editable_proposal(user_id, proposal_id).await?;
        if !self.repo.delete_pending_proposal(proposal.id).await? {
            return Err(forbidden_error("The proposal has already been deliberated"));
        }
        info!(proposal = %proposal_id, "Proposal withdrawn");
        Ok(())
    }

    /// Proposals of the speaker with unpublished decisions hidden
    pub async fn list_own(&self, user_id: Uuid) -> Result<Vec<SpeakerProposal>, AppError> {
        let proposals = self.repo.list_speaker_proposals(user_id).await?;
        let mut events = HashMap::new();
        let mut result = Vec::with_capacity(proposals.len());

        for mut proposal in proposals {
            if !events.contains_key(&proposal.event_id) {
                if let Some(event) = self.repo.find_event(proposal.event_id).await? {
                    events.insert(event.id, event);
                }
            }
            let Some(event) = events.get(&proposal.event_id) else {
                continue;
            };
            proposal.deliberation = proposal.deliberation.visible_to_speaker();
            result.push(SpeakerProposal {
                proposal,
                event_slug: event.slug.clone(),
                event_name: event.name.clone(),
            });
        }
        Ok(result)
    }

    /// Speaker answer to an accepted, published proposal
    pub async fn confirm(
        &self,
        user_id: Uuid,
        proposal_id: Uuid,
        answer: SpeakerAnswer,
    ) -> Result<Proposal, AppError> {
        let mut proposal = self.speaker_proposal(user_id, proposal_id).await?;
        let expected = proposal.deliberation;
        proposal.deliberation.confirm(answer)?;
        proposal.updated_at = Utc::now();

        let proposal = self
            .repo
            .transition_proposal(expected, proposal)
            .await?
            .ok_or(TransitionError::Concurrent)?;
        info!(proposal = %proposal_id, answer = ?answer, "Speaker answered");
        Ok(proposal)
    }

    /// Accepted, published proposals still waiting for the speaker
    pub async fn notifications(&self, user_id: Uuid) -> Result<Vec<SpeakerNotification>, AppError> {
        let mut feed = Vec::new();
        for proposal in self.repo.list_speaker_proposals(user_id).await? {
            if !proposal.deliberation.awaits_confirmation() {
                continue;
            }
            let Some(event) = self.repo.find_event(proposal.event_id).await? else {
                continue;
            };
            feed.push(SpeakerNotification {
                kind: NotificationKind::AcceptedProposal,
                proposal_id: proposal.id,
                proposal_title: proposal.title,
                event_slug: event.slug,
                event_name: event.name,
                date: proposal.updated_at,
            });
        }
        Ok(feed)
    }

    async fn speaker_proposal(&self, user_id: Uuid, proposal_id: Uuid) -> Result<Proposal, AppError> {
        let proposal = self
            .repo
            .find_proposal(proposal_id)
            .await?
            .ok_or_else(|| not_found_error(format!("Proposal {} not found", proposal_id)))?;
        if !proposal.is_speaker(user_id) {
            return Err(forbidden_error("You are not a speaker of this proposal"));
        }
        Ok(proposal)
    }

    async fn editable_proposal(&self, user_id: Uuid, proposal_id: Uuid) -> Result<Proposal, AppError> {
        let proposal = self.speaker_proposal(user_id, proposal_id).await?;
        let event = self
            .repo
            .find_event(proposal.event_id)
            .await?
            .ok_or_else(|| not_found_error("Event not found"))?;

        if !event.is_cfp_open() {
            return Err(forbidden_error("The call for papers is closed"));
        }
        if proposal.deliberation.deliberation_status != DeliberationStatus::Pending {
            return Err(forbidden_error("The proposal has already been deliberated"));
        }
        Ok(proposal)
    }

    // ------------------------------------------------------------------
    // Organizer side
    // ------------------------------------------------------------------

    /// Filtered, sorted and paginated proposals of an event
    pub async fn list_event_proposals(
        &self,
        user_id: Uuid,
        team_slug: &str,
        event_slug: &str,
        query: ProposalListQuery,
    ) -> Result<ProposalPage, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        let event = team_event(self.repo.as_ref(), &team, event_slug).await?;

        let search = query
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        let proposals: Vec<Proposal> = self
            .repo
            .list_event_proposals(event.id)
            .await?
            .into_iter()
            .filter(|p| query.status.map_or(true, |s| matches_status(&p.deliberation, s)))
            .filter(|p| {
                search
                    .as_ref()
                    .map_or(true, |q| p.title.to_lowercase().contains(q.as_str()))
            })
            .collect();

        let ids: Vec<Uuid> = proposals.iter().map(|p| p.id).collect();
        let mut reviews: HashMap<Uuid, Vec<Review>> = HashMap::new();
        for review in self.repo.list_reviews(&ids).await? {
            reviews.entry(review.proposal_id).or_default().push(review);
        }

        let show_reviews = event.display_proposals_reviews || member.role.sees_all_reviews();
        let users = if event.display_proposals_speakers {
            let speaker_ids: Vec<Uuid> = proposals.iter().flat_map(|p| p.speakers.clone()).collect();
            users_by_id(self.repo.as_ref(), &speaker_ids).await?
        } else {
            HashMap::new()
        };

        let mut rows: Vec<(Option<f64>, ProposalSummary)> = proposals
            .into_iter()
            .filter_map(|p| {
                let ratings = reviews.get(&p.id).map(Vec::as_slice).unwrap_or(&[]);
                let details = ReviewDetails::new(ratings);
                let mine = details.from_user(user_id);
                let reviewed = mine.is_some();
                if let Some(filter) = query.reviews {
                    if (filter == ReviewFilter::Reviewed) != reviewed {
                        return None;
                    }
                }
                let summary = details.summary();
                Some((
                    summary.average,
                    ProposalSummary {
                        id: p.id,
                        speakers: p
                            .speakers
                            .iter()
                            .filter_map(|id| users.get(id).map(SpeakerInfo::from))
                            .collect(),
                        title: p.title,
                        deliberation: p.deliberation,
                        reviews: show_reviews.then_some(summary),
                        my_review: mine.map(|r| OwnRating {
                            feeling: r.feeling,
                            score: r.score,
                        }),
                        created_at: p.created_at,
                    },
                ))
            })
            .collect();

        match query.sort {
            SortOrder::Newest => rows.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at)),
            SortOrder::Oldest => rows.sort_by(|a, b| a.1.created_at.cmp(&b.1.created_at)),
            SortOrder::Highest => rows.sort_by(|a, b| compare_averages(a.0, b.0, true)),
            SortOrder::Lowest => rows.sort_by(|a, b| compare_averages(a.0, b.0, false)),
        }

        let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);
        let total = rows.len();
        let proposals = rows
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .map(|(_, summary)| summary)
            .collect();

        debug!(event = %event.slug, total, page, "Listed proposals");
        Ok(ProposalPage {
            proposals,
            total,
            page,
            per_page,
        })
    }

    /// Record the organizers' decision on a proposal
    pub async fn deliberate(
        &self,
        user_id: Uuid,
        team_slug: &str,
        event_slug: &str,
        proposal_id: Uuid,
        decision: Decision,
    ) -> Result<Proposal, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        if !member.role.can_deliberate() {
            return Err(forbidden_error("Only owners and members can deliberate"));
        }
        let event = team_event(self.repo.as_ref(), &team, event_slug).await?;
        let mut proposal = event_proposal(self.repo.as_ref(), &event, proposal_id).await?;

        let expected = proposal.deliberation;
        proposal.deliberation.deliberate(decision)?;
        proposal.updated_at = Utc::now();
        let proposal = self
            .repo
            .transition_proposal(expected, proposal)
            .await?
            .ok_or(TransitionError::Concurrent)?;

        info!(proposal = %proposal_id, decision = ?decision, "Proposal deliberated");
        Ok(proposal)
    }

    /// Publish every decided, unpublished proposal of one outcome and
    /// optionally email the speakers.
    pub async fn publish_results(
        &self,
        user_id: Uuid,
        team_slug: &str,
        event_slug: &str,
        request: PublicationRequest,
    ) -> Result<PublicationResult, AppError> {
        let (team, member) = team_membership(self.repo.as_ref(), team_slug, user_id).await?;
        if !member.role.can_deliberate() {
            return Err(forbidden_error("Only owners and members can publish results"));
        }
        let event = team_event(self.repo.as_ref(), &team, event_slug).await?;
        let outcome = DeliberationStatus::from(request.outcome);

        let mut transitions = Vec::new();
        for mut proposal in self.repo.list_event_proposals(event.id).await? {
            if proposal.deliberation.deliberation_status != outcome
                || proposal.deliberation.is_published()
            {
                continue;
            }
            let expected = proposal.deliberation;
            proposal.deliberation.publish()?;
            proposal.updated_at = Utc::now();
            transitions.push((expected, proposal));
        }
        if transitions.is_empty() {
            return Ok(PublicationResult {
                published: 0,
                emails_queued: 0,
            });
        }

        // Proposals changed since the listing are left for the next publication
        let published_proposals = self.repo.transition_proposals(transitions).await?;
        let published = published_proposals.len();

        let mut emails_queued = 0;
        if request.send_email && published > 0 {
            let speaker_ids: Vec<Uuid> = published_proposals
                .iter()
                .flat_map(|p| p.speakers.clone())
                .collect();
            let users = users_by_id(self.repo.as_ref(), &speaker_ids).await?;
            let messages = publication_messages(&event, &published_proposals, &users);
            emails_queued = spawn_campaign(&self.mail, messages, self.mail_config.batch_size);
        }

        info!(
            event = %event.slug,
            outcome = %outcome,
            published,
            emails_queued,
            "Results published"
        );
        Ok(PublicationResult {
            published,
            emails_queued,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feeling, TeamRole};
    use crate::notifications::{LogMailer, RetryPolicy};
    use crate::services::fixtures::{user, world, World};
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    fn service(w: &World) -> ProposalService {
        let (queue, _worker) = MailQueue::start(Arc::new(LogMailer::new("cfp@test")), RetryPolicy::default());
        ProposalService::new(w.repo.clone(), queue, MailConfig::default())
    }

    fn talk(title: &str) -> SubmitProposalRequest {
        SubmitProposalRequest {
            title: title.to_string(),
            abstract_text: "An abstract".to_string(),
            level: None,
            languages: vec!["en".to_string()],
            references: None,
        }
    }

    #[tokio::test]
    async fn test_submit_outside_cfp_fails() {
        let w = world().await;
        let service = service(&w);
        let speaker = user(w.repo.as_ref(), "speaker").await;

        let mut event = w.event.clone();
        event.cfp_end = Some(Utc::now() - Duration::hours(1));
        event.cfp_start = Some(Utc::now() - Duration::days(2));
        w.repo.update_event(event).await.unwrap();

        let err = service.submit(speaker.id, "devfest", talk("Late")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_max_proposals_enforced() {
        let w = world().await;
        let service = service(&w);
        let speaker = user(w.repo.as_ref(), "speaker").await;

        let mut event = w.event.clone();
        event.max_proposals = Some(1);
        w.repo.update_event(event).await.unwrap();

        assert_ok!(service.submit(speaker.id, "devfest", talk("One")).await);
        assert_err!(service.submit(speaker.id, "devfest", talk("Two")).await);
    }

    #[tokio::test]
    async fn test_update_and_withdraw_only_while_pending() {
        let w = world().await;
        let service = service(&w);
        let speaker = user(w.repo.as_ref(), "speaker").await;
        let proposal = service.submit(speaker.id, "devfest", talk("Draft")).await.unwrap();

        let stranger = user(w.repo.as_ref(), "stranger").await;
        assert_err!(
            service
                .update(stranger.id, proposal.id, UpdateProposalRequest::default())
                .await
        );

        let updated = service
            .update(
                speaker.id,
                proposal.id,
                UpdateProposalRequest {
                    title: Some("Final".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Final");

        service
            .deliberate(w.owner.id, "gdg-nantes", "devfest", proposal.id, Decision::Accepted)
            .await
            .unwrap();
        assert_err!(service.withdraw(speaker.id, proposal.id).await);
    }

    #[tokio::test]
    async fn test_reviewer_cannot_deliberate() {
        let w = world().await;
        let service = service(&w);
        let reviewer = w.member("rita", TeamRole::Reviewer).await;
        let proposal = service.submit(w.owner.id, "devfest", talk("Talk")).await.unwrap();

        let err = service
            .deliberate(reviewer.id, "gdg-nantes", "devfest", proposal.id, Decision::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_full_deliberation_flow() {
        let w = world().await;
        let service = service(&w);
        let speaker = user(w.repo.as_ref(), "speaker").await;
        let accepted = service.submit(speaker.id, "devfest", talk("Accepted")).await.unwrap();
        let rejected = service.submit(speaker.id, "devfest", talk("Rejected")).await.unwrap();

        // Confirmation before any decision is forbidden
        let err = service
            .confirm(speaker.id, accepted.id, SpeakerAnswer::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        service
            .deliberate(w.owner.id, "gdg-nantes", "devfest", accepted.id, Decision::Accepted)
            .await
            .unwrap();
        service
            .deliberate(w.owner.id, "gdg-nantes", "devfest", rejected.id, Decision::Rejected)
            .await
            .unwrap();

        // Decided but unpublished: still hidden and not confirmable
        let own = service.list_own(speaker.id).await.unwrap();
        assert!(own
            .iter()
            .all(|p| p.proposal.deliberation.deliberation_status == DeliberationStatus::Pending));
        assert_err!(
            service
                .confirm(speaker.id, accepted.id, SpeakerAnswer::Confirmed)
                .await
        );

        let result = service
            .publish_results(
                w.owner.id,
                "gdg-nantes",
                "devfest",
                PublicationRequest {
                    outcome: Decision::Accepted,
                    send_email: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            result,
            PublicationResult {
                published: 1,
                emails_queued: 1
            }
        );

        let feed = service.notifications(speaker.id).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].proposal_id, accepted.id);

        let confirmed = service
            .confirm(speaker.id, accepted.id, SpeakerAnswer::Confirmed)
            .await
            .unwrap();
        assert_eq!(
            confirmed.deliberation.confirmation_status,
            Some(ConfirmationStatus::Confirmed)
        );
        assert!(service.notifications(speaker.id).await.unwrap().is_empty());

        // Rejected proposals can never be confirmed
        assert_err!(
            service
                .confirm(speaker.id, rejected.id, SpeakerAnswer::Confirmed)
                .await
        );
    }

    #[tokio::test]
    async fn test_list_filters_sort_and_pagination() {
        let w = world().await;
        let service = service(&w);
        let reviewer = w.member("rita", TeamRole::Reviewer).await;

        let mut ids = Vec::new();
        for (title, score) in [("Low", Some(1)), ("High", Some(5)), ("Unrated", None)] {
            let p = service.submit(w.owner.id, "devfest", talk(title)).await.unwrap();
            if let Some(score) = score {
                w.repo
                    .upsert_review(Review::new(p.id, reviewer.id, Feeling::Neutral, Some(score)))
                    .await
                    .unwrap();
            }
            ids.push(p.id);
        }

        let highest = service
            .list_event_proposals(
                reviewer.id,
                "gdg-nantes",
                "devfest",
                ProposalListQuery {
                    sort: SortOrder::Highest,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let titles: Vec<_> = highest.proposals.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["High", "Low", "Unrated"]);

        let not_reviewed = service
            .list_event_proposals(
                reviewer.id,
                "gdg-nantes",
                "devfest",
                ProposalListQuery {
                    reviews: Some(ReviewFilter::NotReviewed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(not_reviewed.total, 1);
        assert_eq!(not_reviewed.proposals[0].id, ids[2]);

        let search = service
            .list_event_proposals(
                reviewer.id,
                "gdg-nantes",
                "devfest",
                ProposalListQuery {
                    query: Some("hig".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(search.total, 1);

        let page = service
            .list_event_proposals(
                reviewer.id,
                "gdg-nantes",
                "devfest",
                ProposalListQuery {
                    sort: SortOrder::Lowest,
                    page: Some(2),
                    per_page: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.proposals.len(), 1);
        assert_eq!(page.proposals[0].title, "Unrated");
    }

    #[tokio::test]
    async fn test_hidden_reviews_and_speakers() {
        let w = world().await;
        let service = service(&w);
        let reviewer = w.member("rita", TeamRole::Reviewer).await;
        service.submit(w.owner.id, "devfest", talk("Talk")).await.unwrap();

        let mut event = w.event.clone();
        event.display_proposals_reviews = false;
        event.display_proposals_speakers = false;
        w.repo.update_event(event).await.unwrap();

        let as_reviewer = service
            .list_event_proposals(reviewer.id, "gdg-nantes", "devfest", ProposalListQuery::default())
            .await
            .unwrap();
        assert!(as_reviewer.proposals[0].reviews.is_none());
        assert!(as_reviewer.proposals[0].speakers.is_empty());

        let as_owner = service
            .list_event_proposals(w.owner.id, "gdg-nantes", "devfest", ProposalListQuery::default())
            .await
            .unwrap();
        assert!(as_owner.proposals[0].reviews.is_some());
    }

    #[test]
    fn test_status_filter_predicates() {
        let mut state = DeliberationState::default();
        assert!(matches_status(&state, StatusFilter::Pending));
        state.deliberate(Decision::Accepted).unwrap();
        assert!(matches_status(&state, StatusFilter::Accepted));
        assert!(!matches_status(&state, StatusFilter::NotAnswered));
        state.publish().unwrap();
        assert!(matches_status(&state, StatusFilter::NotAnswered));
        state.confirm(SpeakerAnswer::Declined).unwrap();
        assert!(matches_status(&state, StatusFilter::Declined));
        assert!(!matches_status(&state, StatusFilter::Confirmed));
    }

    #[tokio::test]
    async fn test_page_far_past_the_end_is_empty() {
        let w = world().await;
        let service = service(&w);
        service.submit(w.owner.id, "devfest", talk("Talk")).await.unwrap();

        let page = service
            .list_event_proposals(
                w.owner.id,
                "gdg-nantes",
                "devfest",
                ProposalListQuery {
                    page: Some(usize::MAX),
                    per_page: Some(MAX_PAGE_SIZE),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.proposals.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_conflicting_deliberations_have_one_winner() {
        let w = world().await;
        let service = Arc::new(service(&w));
        let owner = w.owner.id;

        for round in 0..20 {
            let proposal = service
                .submit(owner, "devfest", talk(&format!("Talk {}", round)))
                .await
                .unwrap();

            let accept = {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .deliberate(owner, "gdg-nantes", "devfest", proposal.id, Decision::Accepted)
                        .await
                })
            };
            let reject = {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .deliberate(owner, "gdg-nantes", "devfest", proposal.id, Decision::Rejected)
                        .await
                })
            };
            let (accept, reject) = (accept.await.unwrap(), reject.await.unwrap());
            assert_ne!(accept.is_ok(), reject.is_ok());

            let winner = match (&accept, &reject) {
                (Ok(p), _) | (_, Ok(p)) => p.deliberation.deliberation_status,
                _ => unreachable!(),
            };
            let loser = accept.err().or(reject.err()).unwrap();
            assert!(matches!(loser, AppError::Forbidden(_)));

            let stored = w.repo.find_proposal(proposal.id).await.unwrap().unwrap();
            assert_eq!(stored.deliberation.deliberation_status, winner);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_speaker_edit_never_undoes_a_decision() {
        let w = world().await;
        let service = Arc::new(service(&w));
        let owner = w.owner.id;
        let speaker = user(w.repo.as_ref(), "speaker").await.id;

        for round in 0..20 {
            let proposal = service
                .submit(speaker, "devfest", talk(&format!("Talk {}", round)))
                .await
                .unwrap();

            let edit = {
                let service = service.clone();
                tokio::spawn(async move {
                    let update = UpdateProposalRequest {
                        title: Some("Edited".to_string()),
                        ..Default::default()
                    };
                    service.update(speaker, proposal.id, update).await
                })
            };
            let decide = {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .deliberate(owner, "gdg-nantes", "devfest", proposal.id, Decision::Accepted)
                        .await
                })
            };
            let _ = edit.await.unwrap();
            assert_ok!(decide.await.unwrap());

            let stored = w.repo.find_proposal(proposal.id).await.unwrap().unwrap();
            assert_eq!(stored.deliberation.deliberation_status, DeliberationStatus::Accepted);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_speaker_answers_only_once_under_contention() {
        let w = world().await;
        let service = Arc::new(service(&w));
        let speaker = user(w.repo.as_ref(), "speaker").await.id;
        let proposal = service.submit(speaker, "devfest", talk("Talk")).await.unwrap();
        service
            .deliberate(w.owner.id, "gdg-nantes", "devfest", proposal.id, Decision::Accepted)
            .await
            .unwrap();
        service
            .publish_results(
                w.owner.id,
                "gdg-nantes",
                "devfest",
                PublicationRequest {
                    outcome: Decision::Accepted,
                    send_email: false,
                },
            )
            .await
            .unwrap();

        let answers = [SpeakerAnswer::Confirmed, SpeakerAnswer::Declined]
            .into_iter()
            .map(|answer| {
                let service = service.clone();
                tokio::spawn(async move { service.confirm(speaker, proposal.id, answer).await })
            })
            .collect::<Vec<_>>();
        let mut winners = Vec::new();
        for handle in answers {
            if let Ok(p) = handle.await.unwrap() {
                winners.push(p.deliberation.confirmation_status);
            }
        }
        assert_eq!(winners.len(), 1);

        let stored = w.repo.find_proposal(proposal.id).await.unwrap().unwrap();
        assert_eq!(stored.deliberation.confirmation_status, winners[0]);
    }
}
