use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::milestone::MilestoneRepository;
use super::peer_review::PeerReviewRepository;
use super::project::ProjectRepository;
use super::review_topic::ReviewTopicRepository;
use super::role::RoleRepository;
use super::role_metric::RoleMetricRepository;
use crate::error::StorageError;
use crate::models::{Milestone, PeerReview, Project, ReviewTopic, Role, RoleMetric};
use crate::scoring::{Result, ScoringError};
use crate::services::store::{ScoringCommit, ScoringStore};

/// [`ScoringStore`] backed by the Postgres repositories.
#[derive(Debug, Clone)]
pub struct PgScoringStore {
    pool: PgPool,
}

impl PgScoringStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_commit(&self, commit: ScoringCommit<'_>) -> crate::error::Result<()> {
        let mut tx = self.pool.begin().await?;

        RoleMetricRepository::insert_batch(&mut *tx, commit.metrics).await?;
        ProjectRepository::update_state(
            &mut *tx,
            commit.project_id,
            commit.expected_version,
            commit.next_state,
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl ScoringStore for PgScoringStore {
    async fn project(&self, project_id: Uuid) -> Result<Project> {
        Ok(ProjectRepository::new(&self.pool).find_by_id(project_id).await?)
    }

    async fn roles(&self, project_id: Uuid) -> Result<Vec<Role>> {
        Ok(RoleRepository::new(&self.pool)
            .list_for_project(project_id)
            .await?)
    }

    async fn review_topics(&self, project_id: Uuid) -> Result<Vec<ReviewTopic>> {
        Ok(ReviewTopicRepository::new(&self.pool)
            .list_for_project(project_id)
            .await?)
    }

    async fn milestone(&self, milestone_id: Uuid) -> Result<Milestone> {
        Ok(MilestoneRepository::new(&self.pool)
            .find_by_id(milestone_id)
            .await?)
    }

    async fn peer_reviews(&self, project_id: Uuid) -> Result<Vec<PeerReview>> {
        Ok(PeerReviewRepository::new(&self.pool)
            .list_for_project(project_id)
            .await?)
    }

    async fn has_submitted(&self, sender_role_id: Uuid, review_topic_id: Uuid) -> Result<bool> {
        Ok(PeerReviewRepository::new(&self.pool)
            .has_submitted(sender_role_id, review_topic_id)
            .await?)
    }

    async fn submitted_pairs(&self, project_id: Uuid) -> Result<BTreeSet<(Uuid, Uuid)>> {
        Ok(PeerReviewRepository::new(&self.pool)
            .submitted_pairs(project_id)
            .await?)
    }

    async fn insert_peer_reviews(&self, reviews: &[PeerReview]) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(StorageError::from)?;
        Ok(PeerReviewRepository::insert_snapshot(&mut *conn, reviews).await?)
    }

    async fn has_role_metrics(&self, project_id: Uuid, milestone_id: Option<Uuid>) -> Result<bool> {
        Ok(RoleMetricRepository::new(&self.pool)
            .exists_for_scope(project_id, milestone_id)
            .await?)
    }

    async fn role_metrics(
        &self,
        project_id: Uuid,
        milestone_id: Option<Uuid>,
    ) -> Result<Vec<RoleMetric>> {
        Ok(RoleMetricRepository::new(&self.pool)
            .list_for_scope(project_id, milestone_id)
            .await?)
    }

    async fn commit_scoring(&self, commit: ScoringCommit<'_>) -> Result<()> {
        let project_id = commit.project_id;

        self.write_commit(commit).await.map_err(|e| match e {
            e if e.is_unique_violation() => ScoringError::AlreadyScored { project_id },
            StorageError::StaleVersion(_) => ScoringError::Conflict { project_id },
            e => ScoringError::Storage(e),
        })
    }
}
