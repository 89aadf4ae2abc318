use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Role;

/// Repository for Role database operations
pub struct RoleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RoleRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every role of a project, assigned or not
    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT role_id, project_id, assignee_id, title, description
            FROM roles
            WHERE project_id = $1
            ORDER BY title, role_id
            "#,
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        Ok(roles)
    }

    pub async fn create(
        conn: &mut PgConnection,
        project_id: Uuid,
        title: &str,
        description: &str,
        assignee_id: Option<Uuid>,
    ) -> Result<Role> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (project_id, title, description, assignee_id)
            VALUES ($1, $2, $3, $4)
            RETURNING role_id, project_id, assignee_id, title, description
            "#,
        )
        .bind(project_id)
        .bind(title)
        .bind(description)
        .bind(assignee_id)
        .fetch_one(conn)
        .await?;

        Ok(role)
    }
}
