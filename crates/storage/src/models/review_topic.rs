use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One axis of evaluation within a project, scored independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReviewTopic {
    pub review_topic_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    /// Display and scoring order within the project
    pub position: i32,
}
