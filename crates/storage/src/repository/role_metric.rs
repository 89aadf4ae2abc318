use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{decimal_to_f64, f64_to_decimal};
use crate::error::{Result, StorageError};
use crate::models::{Consensuality, Contribution, RoleMetric};

#[derive(FromRow)]
struct RoleMetricRow {
    role_metric_id: Uuid,
    project_id: Uuid,
    role_id: Uuid,
    review_topic_id: Uuid,
    milestone_id: Option<Uuid>,
    contribution: Decimal,
    consensuality: Decimal,
    cliquey: Option<bool>,
    computed_at: NaiveDateTime,
}

impl TryFrom<RoleMetricRow> for RoleMetric {
    type Error = StorageError;

    fn try_from(row: RoleMetricRow) -> Result<Self> {
        let invalid = |e: crate::scoring::ScoringError| StorageError::ConstraintViolation(e.to_string());

        Ok(RoleMetric {
            role_metric_id: row.role_metric_id,
            project_id: row.project_id,
            role_id: row.role_id,
            review_topic_id: row.review_topic_id,
            milestone_id: row.milestone_id,
            contribution: Contribution::new(decimal_to_f64(row.contribution)).map_err(invalid)?,
            consensuality: Consensuality::new(decimal_to_f64(row.consensuality)).map_err(invalid)?,
            cliquey: row.cliquey,
            computed_at: row.computed_at,
        })
    }
}

/// Repository for RoleMetric database operations
pub struct RoleMetricRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoleMetricRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Metrics of one scoring pass; `milestone_id = None` is the project-wide pass.
    pub async fn list_for_scope(
        &self,
        project_id: Uuid,
        milestone_id: Option<Uuid>,
    ) -> Result<Vec<RoleMetric>> {
        let rows = sqlx::query_as::<_, RoleMetricRow>(
            r#"
            SELECT rm.role_metric_id, rm.project_id, rm.role_id, rm.review_topic_id,
                   rm.milestone_id, rm.contribution, rm.consensuality, rm.cliquey,
                   rm.computed_at
            FROM role_metrics rm
            INNER JOIN review_topics rt ON rt.review_topic_id = rm.review_topic_id
            INNER JOIN roles r ON r.role_id = rm.role_id
            WHERE rm.project_id = $1 AND rm.milestone_id IS NOT DISTINCT FROM $2
            ORDER BY rt.position, rt.review_topic_id, r.title, r.role_id
            "#,
        )
        .bind(project_id)
        .bind(milestone_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(RoleMetric::try_from).collect()
    }

    pub async fn exists_for_scope(&self, project_id: Uuid, milestone_id: Option<Uuid>) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM role_metrics
                WHERE project_id = $1 AND milestone_id IS NOT DISTINCT FROM $2
            )
            "#,
        )
        .bind(project_id)
        .bind(milestone_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Inserts a whole scoring pass. Run it inside the caller's transaction;
    /// a second pass for the same scope fails with a unique violation.
    pub async fn insert_batch(conn: &mut PgConnection, metrics: &[RoleMetric]) -> Result<()> {
        if metrics.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            INSERT INTO role_metrics (
                role_metric_id, project_id, role_id, review_topic_id, milestone_id,
                contribution, consensuality, cliquey, computed_at
            )
            "#,
        );
        query.push_values(metrics, |mut row, metric| {
            row.push_bind(metric.role_metric_id)
                .push_bind(metric.project_id)
                .push_bind(metric.role_id)
                .push_bind(metric.review_topic_id)
                .push_bind(metric.milestone_id)
                .push_bind(f64_to_decimal(metric.contribution.value()))
                .push_bind(f64_to_decimal(metric.consensuality.value()))
                .push_bind(metric.cliquey)
                .push_bind(metric.computed_at);
        });

        query.build().execute(conn).await?;

        Ok(())
    }
}
