use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use super::error::{Result, ScoringError};
use super::peer_review_set::PeerReviewSet;
use crate::models::Contribution;

/// Contribution of one role for one review topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleContribution {
    pub role_id: Uuid,
    /// Average score received over the senders of the topic, before rescaling
    pub raw_average: f64,
    pub contribution: Contribution,
}

/// Contributions of every scored role for one topic, in role order.
///
/// The contributions sum to 1 (up to floating point drift).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContributionMap {
    entries: Vec<RoleContribution>,
}

impl ContributionMap {
    pub fn get(&self, role_id: Uuid) -> Option<&RoleContribution> {
        self.entries.iter().find(|e| e.role_id == role_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleContribution> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.contribution.value()).sum()
    }
}

/// Splits the credit of a review topic between roles.
///
/// Each role first gets the average of the scores it received, taken over
/// every sender that submitted for the topic. Those averages are then
/// rescaled so they sum to 1 across the scored roles. Before anyone submits,
/// every role gets an equal share.
pub struct ContributionComputer;

impl ContributionComputer {
    /// `roles` is the universe of assigned roles; every sender and receiver in
    /// `reviews` must be part of it.
    pub fn compute(reviews: &PeerReviewSet, roles: &[Uuid]) -> Result<ContributionMap> {
        if reviews.distinct_topics().len() > 1 {
            let expected = reviews.topic().unwrap_or_else(|| {
                reviews
                    .iter()
                    .next()
                    .map(|r| r.review_topic_id())
                    .unwrap_or_default()
            });
            if let Some(review) = reviews.iter().find(|r| r.review_topic_id() != expected) {
                return Err(ScoringError::TopicMismatch {
                    peer_review_id: review.peer_review_id(),
                    expected,
                    found: review.review_topic_id(),
                });
            }
        }

        let universe: BTreeSet<Uuid> = roles.iter().copied().collect();
        for review in reviews.iter() {
            for role_id in [review.sender_role_id(), review.receiver_role_id()] {
                if !universe.contains(&role_id) {
                    return Err(ScoringError::UnknownRole {
                        role_id,
                        project_id: reviews.project_id(),
                    });
                }
            }
        }

        if roles.is_empty() {
            return Ok(ContributionMap::default());
        }

        let senders = reviews.distinct_sender_roles().len();
        if senders == 0 {
            return Self::equal_split(roles);
        }

        let mut received: HashMap<Uuid, f64> = HashMap::new();
        for review in reviews.iter() {
            *received.entry(review.receiver_role_id()).or_insert(0.0) += review.score();
        }

        let raw: Vec<(Uuid, f64)> = roles
            .iter()
            .map(|role_id| {
                let sum = received.get(role_id).copied().unwrap_or(0.0);
                (*role_id, sum / senders as f64)
            })
            .collect();

        let total: f64 = raw.iter().map(|(_, avg)| avg).sum();
        if total <= 0.0 {
            tracing::warn!(
                project_id = %reviews.project_id(),
                "All received scores are zero, falling back to an equal split"
            );
            return Self::equal_split(roles);
        }

        let entries = raw
            .into_iter()
            .map(|(role_id, raw_average)| {
                Ok(RoleContribution {
                    role_id,
                    raw_average,
                    contribution: Contribution::new((raw_average / total).min(1.0))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ContributionMap { entries })
    }

    fn equal_split(roles: &[Uuid]) -> Result<ContributionMap> {
        let share = 1.0 / roles.len() as f64;
        let entries = roles
            .iter()
            .map(|role_id| {
                Ok(RoleContribution {
                    role_id: *role_id,
                    raw_average: share,
                    contribution: Contribution::new(share)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ContributionMap { entries })
    }
}
