use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A participant slot inside a project.
///
/// Roles are fixed once peer review starts. Only roles with an assignee take
/// part in scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub role_id: Uuid,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: String,
}

impl Role {
    pub fn is_assigned(&self) -> bool {
        self.assignee_id.is_some()
    }
}
