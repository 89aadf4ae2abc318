use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::Milestone;

/// Repository for Milestone database operations
pub struct MilestoneRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MilestoneRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, milestone_id: Uuid) -> Result<Milestone> {
        let milestone = sqlx::query_as::<_, Milestone>(
            r#"
            SELECT milestone_id, project_id, title, created_at
            FROM milestones
            WHERE milestone_id = $1
            "#,
        )
        .bind(milestone_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(milestone)
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Milestone>> {
        let milestones = sqlx::query_as::<_, Milestone>(
            r#"
            SELECT milestone_id, project_id, title, created_at
            FROM milestones
            WHERE project_id = $1
            ORDER BY created_at, milestone_id
            "#,
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        Ok(milestones)
    }

    pub async fn create(conn: &mut PgConnection, project_id: Uuid, title: &str) -> Result<Milestone> {
        let milestone = sqlx::query_as::<_, Milestone>(
            r#"
            INSERT INTO milestones (project_id, title)
            VALUES ($1, $2)
            RETURNING milestone_id, project_id, title, created_at
            "#,
        )
        .bind(project_id)
        .bind(title)
        .fetch_one(conn)
        .await?;

        Ok(milestone)
    }
}
