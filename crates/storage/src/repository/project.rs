use chrono::NaiveDateTime;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{Project, ProjectState};

#[derive(FromRow)]
struct ProjectRow {
    project_id: Uuid,
    title: String,
    state: String,
    version: i32,
    created_at: NaiveDateTime,
}

impl TryFrom<ProjectRow> for Project {
    type Error = StorageError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        let state = row
            .state
            .parse::<ProjectState>()
            .map_err(StorageError::ConstraintViolation)?;

        Ok(Project {
            project_id: row.project_id,
            title: row.title,
            state,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

/// Repository for Project database operations
pub struct ProjectRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProjectRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, project_id: Uuid) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT project_id, title, state, version, created_at
            FROM projects
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        row.try_into()
    }

    pub async fn create(conn: &mut PgConnection, title: &str) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects (title)
            VALUES ($1)
            RETURNING project_id, title, state, version, created_at
            "#,
        )
        .bind(title)
        .fetch_one(conn)
        .await?;

        row.try_into()
    }

    /// Bumps the version, and moves the project to `state` when given, if
    /// nobody changed it since `expected_version`.
    pub async fn update_state(
        conn: &mut PgConnection,
        project_id: Uuid,
        expected_version: i32,
        state: Option<ProjectState>,
    ) -> Result<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            UPDATE projects
            SET state = COALESCE($3, state), version = version + 1
            WHERE project_id = $1 AND version = $2
            RETURNING project_id, title, state, version, created_at
            "#,
        )
        .bind(project_id)
        .bind(expected_version)
        .bind(state.map(|s| s.as_str()))
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| {
            StorageError::StaleVersion(format!(
                "project {} is no longer at version {}",
                project_id, expected_version
            ))
        })?;

        row.try_into()
    }
}
