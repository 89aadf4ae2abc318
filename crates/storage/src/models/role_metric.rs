use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::score::{Consensuality, Contribution};

/// Result of one scoring pass for a (role, review topic) pair.
///
/// Written once per scope (project, or project and milestone), never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMetric {
    pub role_metric_id: Uuid,
    pub project_id: Uuid,
    pub role_id: Uuid,
    pub review_topic_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub contribution: Contribution,
    /// Topic-level agreement, identical for every role of the topic
    pub consensuality: Consensuality,
    /// `None` when fewer than two peers reviewed the role
    pub cliquey: Option<bool>,
    pub computed_at: NaiveDateTime,
}
