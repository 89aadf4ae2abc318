use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use super::config::ScoringConfig;
use super::consensuality::ConsensualityComputer;
use super::contribution::ContributionComputer;
use super::error::{Result, ScoringError};
use super::peer_review_set::PeerReviewSet;
use crate::models::{ReviewTopic, Role, RoleMetric};

/// Runs the contribution and consensuality computers for every review topic
/// of a project and folds the results into role metrics.
///
/// Either every topic succeeds or no metric is returned at all.
#[derive(Debug, Clone, Copy)]
pub struct ReviewTopicAggregator {
    consensuality: ConsensualityComputer,
}

impl ReviewTopicAggregator {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            consensuality: ConsensualityComputer::new(config.cliquism_threshold),
        }
    }

    /// Produces one metric per (assigned role, review topic).
    ///
    /// Topics are visited by `(position, id)` and roles by `(title, id)`, so
    /// the output order only depends on the input data.
    pub fn aggregate(
        &self,
        project_id: Uuid,
        milestone_id: Option<Uuid>,
        topics: &[ReviewTopic],
        reviews: &PeerReviewSet,
        roles: &[Role],
    ) -> Result<Vec<RoleMetric>> {
        if reviews.project_id() != project_id {
            return Err(ScoringError::ProjectMismatch {
                expected: project_id,
                found: reviews.project_id(),
            });
        }

        if let Some(role) = roles.iter().find(|r| r.project_id != project_id) {
            return Err(ScoringError::UnknownRole {
                role_id: role.role_id,
                project_id,
            });
        }
        if let Some(topic) = topics.iter().find(|t| t.project_id != project_id) {
            return Err(ScoringError::UnknownReviewTopic {
                review_topic_id: topic.review_topic_id,
                project_id,
            });
        }

        let known_topics: BTreeSet<Uuid> = topics.iter().map(|t| t.review_topic_id).collect();
        if let Some(review_topic_id) = reviews
            .distinct_topics()
            .into_iter()
            .find(|id| !known_topics.contains(id))
        {
            return Err(ScoringError::UnknownReviewTopic {
                review_topic_id,
                project_id,
            });
        }

        let project_roles: BTreeSet<Uuid> = roles.iter().map(|r| r.role_id).collect();
        for review in reviews.iter() {
            for role_id in [review.sender_role_id(), review.receiver_role_id()] {
                if !project_roles.contains(&role_id) {
                    return Err(ScoringError::UnknownRole {
                        role_id,
                        project_id,
                    });
                }
            }
        }

        let mut topics: Vec<&ReviewTopic> = topics.iter().collect();
        topics.sort_by_key(|t| (t.position, t.review_topic_id));

        let mut assigned: Vec<&Role> = roles.iter().filter(|r| r.is_assigned()).collect();
        assigned.sort_by(|a, b| a.title.cmp(&b.title).then(a.role_id.cmp(&b.role_id)));

        if topics.is_empty() {
            return Ok(Vec::new());
        }
        if assigned.is_empty() {
            return Err(ScoringError::NoAssignedRoles { project_id });
        }

        let role_ids: Vec<Uuid> = assigned.iter().map(|r| r.role_id).collect();
        let universe: BTreeSet<Uuid> = role_ids.iter().copied().collect();
        let reviews = reviews.restricted_to(&universe);
        let computed_at = Utc::now().naive_utc();

        let mut metrics = Vec::with_capacity(topics.len() * role_ids.len());
        for topic in topics {
            let scoped = reviews.for_topic(topic.review_topic_id);
            let contributions = ContributionComputer::compute(&scoped, &role_ids)?;
            let consensus = self.consensuality.compute(&scoped)?;

            tracing::debug!(
                project_id = %project_id,
                review_topic_id = %topic.review_topic_id,
                reviews = scoped.len(),
                consensuality = consensus.consensuality.value(),
                cliquey_roles = consensus.cliquey_roles().len(),
                "Aggregated review topic"
            );

            for entry in contributions.iter() {
                metrics.push(RoleMetric {
                    role_metric_id: Uuid::new_v4(),
                    project_id,
                    role_id: entry.role_id,
                    review_topic_id: topic.review_topic_id,
                    milestone_id,
                    contribution: entry.contribution,
                    consensuality: consensus.consensuality,
                    cliquey: consensus.is_cliquey(entry.role_id),
                    computed_at,
                });
            }
        }

        Ok(metrics)
    }
}
