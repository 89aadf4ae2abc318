use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{decimal_to_f64, f64_to_decimal};
use crate::error::{Result, StorageError};
use crate::models::PeerReview;

#[derive(FromRow)]
struct PeerReviewRow {
    peer_review_id: Uuid,
    project_id: Uuid,
    review_topic_id: Uuid,
    sender_role_id: Uuid,
    receiver_role_id: Uuid,
    score: Decimal,
    submitted_at: NaiveDateTime,
}

impl TryFrom<PeerReviewRow> for PeerReview {
    type Error = StorageError;

    fn try_from(row: PeerReviewRow) -> Result<Self> {
        let review = PeerReview::new(
            row.project_id,
            row.review_topic_id,
            row.sender_role_id,
            row.receiver_role_id,
            decimal_to_f64(row.score),
        )
        .map_err(|e| StorageError::ConstraintViolation(e.to_string()))?;

        Ok(review
            .with_id(row.peer_review_id)
            .with_submitted_at(row.submitted_at))
    }
}

/// Repository for PeerReview database operations
pub struct PeerReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PeerReviewRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every stored review of the project, superseded snapshots included.
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<PeerReview>> {
        let rows = sqlx::query_as::<_, PeerReviewRow>(
            r#"
            SELECT peer_review_id, project_id, review_topic_id, sender_role_id,
                   receiver_role_id, score, submitted_at
            FROM peer_reviews
            WHERE project_id = $1
            ORDER BY submitted_at, peer_review_id
            "#,
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(PeerReview::try_from).collect()
    }

    pub async fn has_submitted(&self, sender_role_id: Uuid, review_topic_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM peer_reviews
                WHERE sender_role_id = $1 AND review_topic_id = $2
            )
            "#,
        )
        .bind(sender_role_id)
        .bind(review_topic_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Distinct `(sender_role_id, review_topic_id)` pairs that have submitted.
    pub async fn submitted_pairs(&self, project_id: Uuid) -> Result<BTreeSet<(Uuid, Uuid)>> {
        let pairs = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT DISTINCT sender_role_id, review_topic_id
            FROM peer_reviews
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        Ok(pairs.into_iter().collect())
    }

    pub async fn insert_snapshot(conn: &mut PgConnection, reviews: &[PeerReview]) -> Result<()> {
        if reviews.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            INSERT INTO peer_reviews (
                peer_review_id, project_id, review_topic_id, sender_role_id,
                receiver_role_id, score, submitted_at
            )
            "#,
        );
        query.push_values(reviews, |mut row, review| {
            row.push_bind(review.peer_review_id())
                .push_bind(review.project_id())
                .push_bind(review.review_topic_id())
                .push_bind(review.sender_role_id())
                .push_bind(review.receiver_role_id())
                .push_bind(f64_to_decimal(review.score()))
                .push_bind(review.submitted_at());
        });

        query.build().execute(conn).await?;

        Ok(())
    }
}
