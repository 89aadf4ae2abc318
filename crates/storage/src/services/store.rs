use std::collections::BTreeSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Milestone, PeerReview, Project, ProjectState, ReviewTopic, Role, RoleMetric};
use crate::scoring::Result;

/// Everything written by one scoring pass.
#[derive(Debug, Clone, Copy)]
pub struct ScoringCommit<'a> {
    pub project_id: Uuid,
    /// The project version the pass was computed against
    pub expected_version: i32,
    /// New lifecycle state, `None` for milestone passes
    pub next_state: Option<ProjectState>,
    pub metrics: &'a [RoleMetric],
}

/// Persistence consumed by the scoring services.
#[async_trait]
pub trait ScoringStore: Send + Sync {
    async fn project(&self, project_id: Uuid) -> Result<Project>;

    async fn roles(&self, project_id: Uuid) -> Result<Vec<Role>>;

    async fn review_topics(&self, project_id: Uuid) -> Result<Vec<ReviewTopic>>;

    async fn milestone(&self, milestone_id: Uuid) -> Result<Milestone>;

    async fn peer_reviews(&self, project_id: Uuid) -> Result<Vec<PeerReview>>;

    async fn has_submitted(&self, sender_role_id: Uuid, review_topic_id: Uuid) -> Result<bool>;

    /// Distinct `(sender_role_id, review_topic_id)` pairs with a submission.
    async fn submitted_pairs(&self, project_id: Uuid) -> Result<BTreeSet<(Uuid, Uuid)>>;

    /// Stores one sender's snapshot for one topic.
    async fn insert_peer_reviews(&self, reviews: &[PeerReview]) -> Result<()>;

    async fn has_role_metrics(&self, project_id: Uuid, milestone_id: Option<Uuid>) -> Result<bool>;

    async fn role_metrics(&self, project_id: Uuid, milestone_id: Option<Uuid>)
    -> Result<Vec<RoleMetric>>;

    /// Persists the metrics and bumps the project version in one transaction.
    ///
    /// Fails with `Conflict` when the project moved past `expected_version`
    /// and with `AlreadyScored` when metrics exist for the same scope.
    async fn commit_scoring(&self, commit: ScoringCommit<'_>) -> Result<()>;
}
