use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lifecycle::ProjectState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: Uuid,
    pub title: String,
    pub state: ProjectState,
    /// Bumped on every state change, used for optimistic concurrency
    pub version: i32,
    pub created_at: NaiveDateTime,
}
