use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::locks::ProjectLocks;
use super::project_scoring::{ProjectScoringService, ScoringOutcome};
use super::publish_event;
use super::store::ScoringStore;
use crate::events::{EventPublisher, EventRegistry, PeerReviewSubmitted};
use crate::models::{PeerReview, ProjectState};
use crate::scoring::{ResubmissionPolicy, Result, ScoringConfig, ScoringError};

/// Score given to one receiver.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PeerScore {
    pub receiver_role_id: Uuid,

    #[validate(range(min = 0.0, max = 1.0, message = "Score must be between 0 and 1"))]
    pub score: f64,
}

/// One sender's distribution of credit for one review topic.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Submission {
    pub project_id: Uuid,
    pub review_topic_id: Uuid,
    pub sender_role_id: Uuid,

    #[validate(length(min = 1, message = "At least one score is required"))]
    #[validate(nested)]
    pub scores: Vec<PeerScore>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// Stored; other roles still have to submit
    Submitted { reviews: Vec<PeerReview> },
    /// This submission completed the round and the project was scored
    Finalized(ScoringOutcome),
}

/// Accepts peer review submissions and finalizes the project once every
/// assigned role has submitted for every review topic.
#[derive(Clone)]
pub struct PeerReviewService {
    store: Arc<dyn ScoringStore>,
    scoring: ProjectScoringService,
    config: ScoringConfig,
    registry: Arc<EventRegistry>,
    publisher: Arc<dyn EventPublisher>,
    locks: ProjectLocks,
}

impl PeerReviewService {
    pub fn new(
        store: Arc<dyn ScoringStore>,
        config: ScoringConfig,
        registry: Arc<EventRegistry>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let locks = ProjectLocks::new();
        let scoring =
            ProjectScoringService::new(store.clone(), &config, registry.clone(), publisher.clone())
                .with_locks(locks.clone());

        Self {
            store,
            scoring,
            config,
            registry,
            publisher,
            locks,
        }
    }

    /// The scoring service sharing this service's project locks.
    pub fn scoring(&self) -> &ProjectScoringService {
        &self.scoring
    }

    pub async fn submit(&self, submission: Submission) -> Result<SubmissionOutcome> {
        submission.validate()?;

        let project_id = submission.project_id;
        let reviews = {
            let _guard = self.locks.lock(project_id).await;
            let reviews = self.check(&submission).await?;
            self.store.insert_peer_reviews(&reviews).await?;
            reviews
        };

        let submitted_at = reviews
            .first()
            .map(PeerReview::submitted_at)
            .unwrap_or_else(|| Utc::now().naive_utc());

        tracing::info!(
            project_id = %project_id,
            review_topic_id = %submission.review_topic_id,
            sender_role_id = %submission.sender_role_id,
            reviews = reviews.len(),
            "Peer reviews submitted"
        );

        publish_event(
            &self.registry,
            self.publisher.as_ref(),
            &PeerReviewSubmitted {
                project_id,
                review_topic_id: submission.review_topic_id,
                sender_role_id: submission.sender_role_id,
                submitted_at,
            },
        )
        .await;

        if !self.round_complete(project_id).await? {
            return Ok(SubmissionOutcome::Submitted { reviews });
        }

        match self.scoring.score(project_id, None).await {
            Ok(outcome) => Ok(SubmissionOutcome::Finalized(outcome)),
            Err(e) if e.is_lost_race() => {
                tracing::warn!(
                    project_id = %project_id,
                    "Project already finalized by a concurrent submission: {}",
                    e
                );
                Ok(SubmissionOutcome::Submitted { reviews })
            }
            Err(e) => Err(e),
        }
    }

    /// Checks the submission against the project and builds its snapshot.
    async fn check(&self, submission: &Submission) -> Result<Vec<PeerReview>> {
        let project_id = submission.project_id;
        let sender_role_id = submission.sender_role_id;

        let project = self.store.project(project_id).await?;
        if project.state != ProjectState::PeerReview {
            return Err(ScoringError::UnexpectedState {
                project_id,
                state: project.state.to_string(),
                expected: ProjectState::PeerReview.to_string(),
            });
        }

        let topics = self.store.review_topics(project_id).await?;
        if !topics
            .iter()
            .any(|t| t.review_topic_id == submission.review_topic_id)
        {
            return Err(ScoringError::UnknownReviewTopic {
                review_topic_id: submission.review_topic_id,
                project_id,
            });
        }

        let assigned: BTreeSet<Uuid> = self
            .store
            .roles(project_id)
            .await?
            .iter()
            .filter(|r| r.is_assigned())
            .map(|r| r.role_id)
            .collect();
        if !assigned.contains(&sender_role_id) {
            return Err(ScoringError::UnknownRole {
                role_id: sender_role_id,
                project_id,
            });
        }

        let submitted_at = Utc::now().naive_utc();
        let reviews = submission
            .scores
            .iter()
            .map(|s| {
                PeerReview::new(
                    project_id,
                    submission.review_topic_id,
                    sender_role_id,
                    s.receiver_role_id,
                    s.score,
                )
                .map(|r| r.with_submitted_at(submitted_at))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut receivers = BTreeSet::new();
        for review in &reviews {
            let receiver = review.receiver_role_id();
            if !assigned.contains(&receiver) {
                return Err(ScoringError::UnknownRole {
                    role_id: receiver,
                    project_id,
                });
            }
            if !receivers.insert(receiver) {
                return Err(ScoringError::DuplicateReview {
                    peer_review_id: review.peer_review_id(),
                });
            }
        }

        let others: BTreeSet<Uuid> = assigned
            .into_iter()
            .filter(|id| *id != sender_role_id)
            .collect();
        if receivers != others {
            return Err(ScoringError::IncompleteDistribution { sender_role_id });
        }

        let sum: f64 = reviews.iter().map(PeerReview::score).sum();
        if (sum - 1.0).abs() > self.config.sum_epsilon {
            return Err(ScoringError::DistributionSum {
                sender_role_id,
                sum,
            });
        }

        if self.config.resubmission_policy == ResubmissionPolicy::Reject
            && self
                .store
                .has_submitted(sender_role_id, submission.review_topic_id)
                .await?
        {
            return Err(ScoringError::AlreadySubmitted {
                sender_role_id,
                review_topic_id: submission.review_topic_id,
            });
        }

        Ok(reviews)
    }

    /// Whether every assigned role submitted for every review topic.
    async fn round_complete(&self, project_id: Uuid) -> Result<bool> {
        let topics = self.store.review_topics(project_id).await?;
        if topics.is_empty() {
            return Ok(false);
        }

        let roles = self.store.roles(project_id).await?;
        let submitted = self.store.submitted_pairs(project_id).await?;

        Ok(roles.iter().filter(|r| r.is_assigned()).all(|role| {
            topics
                .iter()
                .all(|t| submitted.contains(&(role.role_id, t.review_topic_id)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BroadcastPublisher;
    use crate::services::memory::{InMemoryStore, Seeded};

    fn service_with(store: Arc<InMemoryStore>, config: ScoringConfig) -> PeerReviewService {
        PeerReviewService::new(
            store,
            config,
            Arc::new(EventRegistry::with_defaults()),
            Arc::new(BroadcastPublisher::default()),
        )
    }

    fn service(store: Arc<InMemoryStore>) -> PeerReviewService {
        service_with(store, ScoringConfig::default())
    }

    fn submission(seeded: &Seeded, sender: usize, scores: &[(usize, f64)]) -> Submission {
        Submission {
            project_id: seeded.project.project_id,
            review_topic_id: seeded.topics[0].review_topic_id,
            sender_role_id: seeded.roles[sender].role_id,
            scores: scores
                .iter()
                .map(|(receiver, score)| PeerScore {
                    receiver_role_id: seeded.roles[*receiver].role_id,
                    score: *score,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_last_submission_finalizes_project() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B"], &["Effort"]);
        let service = service(store.clone());

        let first = service
            .submit(submission(&seeded, 0, &[(1, 1.0)]))
            .await
            .unwrap();
        assert!(matches!(first, SubmissionOutcome::Submitted { ref reviews } if reviews.len() == 1));
        assert_eq!(
            store.project_state(seeded.project.project_id),
            ProjectState::PeerReview
        );

        let second = service
            .submit(submission(&seeded, 1, &[(0, 1.0)]))
            .await
            .unwrap();
        match second {
            SubmissionOutcome::Finalized(outcome) => {
                assert_eq!(outcome.state, ProjectState::ManagerReview);
                assert_eq!(outcome.metrics.len(), 2);
            }
            other => panic!("expected finalization, got {:?}", other),
        }
        assert_eq!(store.stored_metrics().len(), 2);
    }

    #[tokio::test]
    async fn test_submission_shares_one_timestamp() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B", "C"], &["Effort"]);
        let service = service(store.clone());

        service
            .submit(submission(&seeded, 0, &[(1, 0.4), (2, 0.6)]))
            .await
            .unwrap();

        let stored = store.stored_reviews();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].submitted_at(), stored[1].submitted_at());
    }

    #[tokio::test]
    async fn test_empty_scores_fail_validation() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B"], &["Effort"]);

        let result = service(store).submit(submission(&seeded, 0, &[])).await;

        assert!(matches!(result, Err(ScoringError::Validation(_))));
    }

    #[tokio::test]
    async fn test_score_out_of_range_fails_validation() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B"], &["Effort"]);

        let result = service(store)
            .submit(submission(&seeded, 0, &[(1, 1.5)]))
            .await;

        assert!(matches!(result, Err(ScoringError::Validation(_))));
    }

    #[tokio::test]
    async fn test_self_review_is_rejected() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B"], &["Effort"]);

        let result = service(store.clone())
            .submit(submission(&seeded, 0, &[(0, 1.0)]))
            .await;

        assert!(matches!(result, Err(ScoringError::SelfReview { .. })));
        assert!(store.stored_reviews().is_empty());
    }

    #[tokio::test]
    async fn test_distribution_must_sum_to_one() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B", "C"], &["Effort"]);

        let result = service(store.clone())
            .submit(submission(&seeded, 0, &[(1, 0.3), (2, 0.3)]))
            .await;

        assert!(matches!(result, Err(ScoringError::DistributionSum { .. })));
        assert!(store.stored_reviews().is_empty());
    }

    #[tokio::test]
    async fn test_distribution_must_cover_every_other_role() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B", "C"], &["Effort"]);

        let result = service(store)
            .submit(submission(&seeded, 0, &[(1, 1.0)]))
            .await;

        assert!(matches!(
            result,
            Err(ScoringError::IncompleteDistribution { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_receiver_is_rejected() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B"], &["Effort"]);
        let mut request = submission(&seeded, 0, &[(1, 1.0)]);
        request.scores[0].receiver_role_id = Uuid::new_v4();

        let result = service(store).submit(request).await;

        assert!(matches!(result, Err(ScoringError::UnknownRole { .. })));
    }

    #[tokio::test]
    async fn test_submission_outside_peer_review_is_rejected() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::Formation, &["A", "B"], &["Effort"]);

        let result = service(store)
            .submit(submission(&seeded, 0, &[(1, 1.0)]))
            .await;

        assert!(matches!(result, Err(ScoringError::UnexpectedState { .. })));
    }

    #[tokio::test]
    async fn test_reject_policy_refuses_second_submission() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B", "C"], &["Effort"]);
        let config = ScoringConfig {
            resubmission_policy: ResubmissionPolicy::Reject,
            ..ScoringConfig::default()
        };
        let service = service_with(store.clone(), config);

        service
            .submit(submission(&seeded, 0, &[(1, 0.5), (2, 0.5)]))
            .await
            .unwrap();
        let again = service
            .submit(submission(&seeded, 0, &[(1, 0.2), (2, 0.8)]))
            .await;

        assert!(matches!(again, Err(ScoringError::AlreadySubmitted { .. })));
        assert_eq!(store.stored_reviews().len(), 2);
    }

    #[tokio::test]
    async fn test_latest_submission_wins() {
        let store = Arc::new(InMemoryStore::default());
        let seeded = store.seed(ProjectState::PeerReview, &["A", "B", "C"], &["Effort"]);
        let service = service(store.clone());

        service
            .submit(submission(&seeded, 0, &[(1, 0.2), (2, 0.8)]))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        service
            .submit(submission(&seeded, 0, &[(1, 0.8), (2, 0.2)]))
            .await
            .unwrap();

        assert_eq!(store.stored_reviews().len(), 4);

        let metrics = service
            .scoring()
            .preview(seeded.project.project_id)
            .await
            .unwrap();
        let b = metrics
            .iter()
            .find(|m| m.role_id == seeded.roles[1].role_id)
            .unwrap();
        assert!((b.contribution.value() - 0.8).abs() < 1e-9);
    }
}
