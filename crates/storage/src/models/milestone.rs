use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Project timeline checkpoint that can scope its own scoring pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Milestone {
    pub milestone_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub created_at: NaiveDateTime,
}
