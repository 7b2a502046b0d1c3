//! Review aggregation
//!
//! Rating statistics computed over the reviews of one proposal.

use crate::models::{Feeling, Review};
use serde::Serialize;
use uuid::Uuid;

/// Aggregated statistics of a proposal
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub average: Option<f64>,
    pub positives: usize,
    pub negatives: usize,
}

/// Read-only view over the reviews of a single proposal
#[derive(Debug, Clone, Copy)]
pub struct ReviewDetails<'a> {
    reviews: &'a [Review],
}

impl<'a> ReviewDetails<'a> {
    pub fn new(reviews: &'a [Review]) -> Self {
        Self { reviews }
    }

    pub fn positives(&self) -> usize {
        self.count(Feeling::Positive)
    }

    pub fn negatives(&self) -> usize {
        self.count(Feeling::Negative)
    }

    /// Mean score, ignoring `NO_OPINION` ratings and missing scores.
    /// `None` when nothing is left to average.
    pub fn average(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .reviews
            .iter()
            .filter(|r| r.feeling != Feeling::NoOpinion)
            .filter_map(|r| r.score)
            .map(f64::from)
            .collect();

        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    /// The rating given by `user_id`, if any
    pub fn from_user(&self, user_id: Uuid) -> Option<&'a Review> {
        self.reviews.iter().find(|r| r.user_id == user_id)
    }

    pub fn summary(&self) -> ReviewSummary {
        ReviewSummary {
            average: self.average(),
            positives: self.positives(),
            negatives: self.negatives(),
        }
    }

    fn count(&self, feeling: Feeling) -> usize {
        self.reviews.iter().filter(|r| r.feeling == feeling).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rating(feeling: Feeling, score: Option<i32>) -> Review {
        Review::new(Uuid::new_v4(), Uuid::new_v4(), feeling, score)
    }

    #[test]
    fn test_average_of_two_scores() {
        let reviews = vec![
            rating(Feeling::Positive, Some(3)),
            rating(Feeling::Negative, Some(1)),
        ];
        assert_eq!(ReviewDetails::new(&reviews).average(), Some(2.0));
    }

    #[test]
    fn test_average_ignores_no_opinion_and_missing_scores() {
        let reviews = vec![
            rating(Feeling::Neutral, Some(4)),
            rating(Feeling::NoOpinion, Some(0)),
            rating(Feeling::Neutral, None),
            rating(Feeling::Positive, Some(5)),
        ];
        assert_eq!(ReviewDetails::new(&reviews).average(), Some(4.5));
    }

    #[test]
    fn test_average_of_excluded_set_is_none() {
        let reviews = vec![
            rating(Feeling::NoOpinion, None),
            rating(Feeling::NoOpinion, Some(3)),
            rating(Feeling::Neutral, None),
        ];
        assert_eq!(ReviewDetails::new(&reviews).average(), None);
        assert_eq!(ReviewDetails::new(&[]).average(), None);
    }

    #[test]
    fn test_counts_match_feelings() {
        let reviews = vec![
            rating(Feeling::Positive, Some(5)),
            rating(Feeling::Positive, Some(5)),
            rating(Feeling::Negative, Some(0)),
            rating(Feeling::Neutral, Some(2)),
            rating(Feeling::NoOpinion, None),
        ];
        let details = ReviewDetails::new(&reviews);
        assert_eq!(details.positives(), 2);
        assert_eq!(details.negatives(), 1);
        assert_eq!(
            details.summary(),
            ReviewSummary {
                average: Some(3.0),
                positives: 2,
                negatives: 1,
            }
        );
    }

    #[test]
    fn test_from_user() {
        let reviews = vec![
            rating(Feeling::Positive, Some(5)),
            rating(Feeling::Negative, Some(0)),
        ];
        let details = ReviewDetails::new(&reviews);
        let found = details.from_user(reviews[1].user_id).unwrap();
        assert_eq!(found.feeling, Feeling::Negative);
        assert!(details.from_user(Uuid::new_v4()).is_none());
    }
}
