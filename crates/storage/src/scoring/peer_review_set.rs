use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::error::{Result, ScoringError};
use crate::models::PeerReview;

/// Validated, immutable batch of peer reviews for one project.
///
/// A set is either project-wide or scoped to a single review topic. The
/// reviews one sender submits for a topic in one go share a `submitted_at`
/// and form a snapshot; when a topic was submitted more than once, only the
/// latest snapshot is kept. Lookups return reviews in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerReviewSet {
    project_id: Uuid,
    topic: Option<Uuid>,
    reviews: Vec<PeerReview>,
}

impl PeerReviewSet {
    pub fn new(project_id: Uuid, reviews: impl IntoIterator<Item = PeerReview>) -> Result<Self> {
        let reviews: Vec<PeerReview> = reviews.into_iter().collect();

        for review in &reviews {
            if review.project_id() != project_id {
                return Err(ScoringError::ForeignProject {
                    peer_review_id: review.peer_review_id(),
                    expected: project_id,
                    found: review.project_id(),
                });
            }
            if review.sender_role_id() == review.receiver_role_id() {
                return Err(ScoringError::SelfReview {
                    role_id: review.sender_role_id(),
                });
            }
        }

        let reviews = Self::latest_snapshots(reviews);
        Self::reject_duplicates(&reviews)?;

        Ok(Self {
            project_id,
            topic: None,
            reviews,
        })
    }

    /// Builds a set that must only contain reviews of `topic_id`.
    pub fn for_single_topic(
        project_id: Uuid,
        topic_id: Uuid,
        reviews: impl IntoIterator<Item = PeerReview>,
    ) -> Result<Self> {
        let set = Self::new(project_id, reviews)?;

        if let Some(review) = set
            .reviews
            .iter()
            .find(|r| r.review_topic_id() != topic_id)
        {
            return Err(ScoringError::TopicMismatch {
                peer_review_id: review.peer_review_id(),
                expected: topic_id,
                found: review.review_topic_id(),
            });
        }

        Ok(Self {
            topic: Some(topic_id),
            ..set
        })
    }

    pub fn empty(project_id: Uuid) -> Self {
        Self {
            project_id,
            topic: None,
            reviews: Vec::new(),
        }
    }

    fn latest_snapshots(reviews: Vec<PeerReview>) -> Vec<PeerReview> {
        let mut latest: HashMap<(Uuid, Uuid), NaiveDateTime> = HashMap::new();
        for review in &reviews {
            let key = (review.sender_role_id(), review.review_topic_id());
            latest
                .entry(key)
                .and_modify(|at| *at = (*at).max(review.submitted_at()))
                .or_insert(review.submitted_at());
        }

        reviews
            .into_iter()
            .filter(|r| latest[&(r.sender_role_id(), r.review_topic_id())] == r.submitted_at())
            .collect()
    }

    fn reject_duplicates(reviews: &[PeerReview]) -> Result<()> {
        let mut seen = HashSet::new();
        for review in reviews {
            let key = (
                review.sender_role_id(),
                review.receiver_role_id(),
                review.review_topic_id(),
            );
            if !seen.insert(key) {
                return Err(ScoringError::DuplicateReview {
                    peer_review_id: review.peer_review_id(),
                });
            }
        }
        Ok(())
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    /// The review topic this set is scoped to, if any.
    pub fn topic(&self) -> Option<Uuid> {
        self.topic
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerReview> {
        self.reviews.iter()
    }

    /// Subset for one review topic. An unknown topic yields an empty set.
    pub fn for_topic(&self, topic_id: Uuid) -> PeerReviewSet {
        PeerReviewSet {
            project_id: self.project_id,
            topic: Some(topic_id),
            reviews: self
                .reviews
                .iter()
                .filter(|r| r.review_topic_id() == topic_id)
                .cloned()
                .collect(),
        }
    }

    pub fn sent_by(&self, role_id: Uuid) -> impl Iterator<Item = &PeerReview> {
        self.reviews
            .iter()
            .filter(move |r| r.sender_role_id() == role_id)
    }

    pub fn received_by(&self, role_id: Uuid) -> impl Iterator<Item = &PeerReview> {
        self.reviews
            .iter()
            .filter(move |r| r.receiver_role_id() == role_id)
    }

    pub fn distinct_sender_roles(&self) -> BTreeSet<Uuid> {
        self.reviews.iter().map(|r| r.sender_role_id()).collect()
    }

    pub fn distinct_receiver_roles(&self) -> BTreeSet<Uuid> {
        self.reviews.iter().map(|r| r.receiver_role_id()).collect()
    }

    pub fn distinct_topics(&self) -> BTreeSet<Uuid> {
        self.reviews.iter().map(|r| r.review_topic_id()).collect()
    }

    /// Drops every review whose sender or receiver is outside `roles`.
    pub fn restricted_to(&self, roles: &BTreeSet<Uuid>) -> PeerReviewSet {
        PeerReviewSet {
            project_id: self.project_id,
            topic: self.topic,
            reviews: self
                .reviews
                .iter()
                .filter(|r| roles.contains(&r.sender_role_id()) && roles.contains(&r.receiver_role_id()))
                .cloned()
                .collect(),
        }
    }
}
