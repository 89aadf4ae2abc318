use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::locks::ProjectLocks;
use super::publish_event;
use super::store::{ScoringCommit, ScoringStore};
use crate::events::{EventPublisher, EventRegistry, PeerReviewFinished};
use crate::models::{ProjectEvent, ProjectState, RoleMetric, SideEffect};
use crate::scoring::{PeerReviewSet, Result, ReviewTopicAggregator, ScoringConfig, ScoringError};

/// Result of a committed scoring pass.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringOutcome {
    pub project_id: Uuid,
    pub milestone_id: Option<Uuid>,
    /// Project state after the pass
    pub state: ProjectState,
    pub effects: Vec<SideEffect>,
    pub metrics: Vec<RoleMetric>,
}

/// Entry point invoked when a project, or one of its milestones, leaves peer
/// review.
///
/// A pass loads the project snapshot, aggregates every review topic and
/// commits the metrics together with the lifecycle transition. Passes on the
/// same project are serialized, and a scope that already has metrics is never
/// scored twice.
#[derive(Clone)]
pub struct ProjectScoringService {
    store: Arc<dyn ScoringStore>,
    aggregator: ReviewTopicAggregator,
    registry: Arc<EventRegistry>,
    publisher: Arc<dyn EventPublisher>,
    locks: ProjectLocks,
}

impl ProjectScoringService {
    pub fn new(
        store: Arc<dyn ScoringStore>,
        config: &ScoringConfig,
        registry: Arc<EventRegistry>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            aggregator: ReviewTopicAggregator::new(config),
            registry,
            publisher,
            locks: ProjectLocks::new(),
        }
    }

    /// Shares a lock table with other services working on the same projects.
    pub fn with_locks(mut self, locks: ProjectLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Scores the project, or one milestone of it, and persists the metrics.
    ///
    /// Without a milestone the project leaves peer review for manager review.
    /// A milestone pass leaves the project state untouched.
    pub async fn score(
        &self,
        project_id: Uuid,
        milestone_id: Option<Uuid>,
    ) -> Result<ScoringOutcome> {
        let _guard = self.locks.lock(project_id).await;

        if self.store.has_role_metrics(project_id, milestone_id).await? {
            return Err(ScoringError::AlreadyScored { project_id });
        }

        let project = self.store.project(project_id).await?;
        if project.state != ProjectState::PeerReview {
            return Err(ScoringError::UnexpectedState {
                project_id,
                state: project.state.to_string(),
                expected: ProjectState::PeerReview.to_string(),
            });
        }

        let transition = match milestone_id {
            None => Some(project.state.transition(ProjectEvent::FinishPeerReview)?),
            Some(milestone_id) => {
                let milestone = self.store.milestone(milestone_id).await?;
                if milestone.project_id != project_id {
                    return Err(ScoringError::UnknownMilestone {
                        milestone_id,
                        project_id,
                    });
                }
                None
            }
        };

        let metrics = self.compute(project_id, milestone_id).await?;

        self.store
            .commit_scoring(ScoringCommit {
                project_id,
                expected_version: project.version,
                next_state: transition.map(|t| t.next),
                metrics: &metrics,
            })
            .await?;

        let state = transition.map_or(project.state, |t| t.next);
        tracing::info!(
            project_id = %project_id,
            milestone_id = ?milestone_id,
            metrics = metrics.len(),
            state = %state,
            "Scored peer reviews"
        );

        publish_event(
            &self.registry,
            self.publisher.as_ref(),
            &PeerReviewFinished {
                project_id,
                milestone_id,
                role_metrics: metrics.clone(),
            },
        )
        .await;

        Ok(ScoringOutcome {
            project_id,
            milestone_id,
            state,
            effects: transition.map(|t| t.effects.to_vec()).unwrap_or_default(),
            metrics,
        })
    }

    /// Computes the metrics the project would get now, without persisting.
    pub async fn preview(&self, project_id: Uuid) -> Result<Vec<RoleMetric>> {
        self.compute(project_id, None).await
    }

    pub async fn metrics(
        &self,
        project_id: Uuid,
        milestone_id: Option<Uuid>,
    ) -> Result<Vec<RoleMetric>> {
        self.store.role_metrics(project_id, milestone_id).await
    }

    async fn compute(&self, project_id: Uuid, milestone_id: Option<Uuid>) -> Result<Vec<RoleMetric>> {
        let roles = self.store.roles(project_id).await?;
        let topics = self.store.review_topics(project_id).await?;
        let reviews = PeerReviewSet::new(project_id, self.store.peer_reviews(project_id).await?)?;

        tracing::debug!(
            project_id = %project_id,
            roles = roles.len(),
            topics = topics.len(),
            reviews = reviews.len(),
            "Aggregating peer reviews"
        );

        self.aggregator
            .aggregate(project_id, milestone_id, &topics, &reviews, &roles)
    }
}
