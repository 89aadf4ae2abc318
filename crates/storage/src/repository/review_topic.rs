use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::ReviewTopic;

/// Repository for ReviewTopic database operations
pub struct ReviewTopicRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewTopicRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<ReviewTopic>> {
        let topics = sqlx::query_as::<_, ReviewTopic>(
            r#"
            SELECT review_topic_id, project_id, title, description, position
            FROM review_topics
            WHERE project_id = $1
            ORDER BY position, review_topic_id
            "#,
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        Ok(topics)
    }

    pub async fn create(
        conn: &mut PgConnection,
        project_id: Uuid,
        title: &str,
        description: &str,
        position: i32,
    ) -> Result<ReviewTopic> {
        let topic = sqlx::query_as::<_, ReviewTopic>(
            r#"
            INSERT INTO review_topics (project_id, title, description, position)
            VALUES ($1, $2, $3, $4)
            RETURNING review_topic_id, project_id, title, description, position
            "#,
        )
        .bind(project_id)
        .bind(title)
        .bind(description)
        .bind(position)
        .fetch_one(conn)
        .await?;

        Ok(topic)
    }
}
