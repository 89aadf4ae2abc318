use thiserror::Error;
use uuid::Uuid;

use crate::error::StorageError;

pub type Result<T> = std::result::Result<T, ScoringError>;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Role {role_id} cannot review itself")]
    SelfReview { role_id: Uuid },

    #[error("Score {score} is outside [0, 1]")]
    ScoreOutOfRange { score: f64 },

    #[error("Peer review {peer_review_id} belongs to project {found}, expected {expected}")]
    ForeignProject {
        peer_review_id: Uuid,
        expected: Uuid,
        found: Uuid,
    },

    #[error("Peer review {peer_review_id} belongs to review topic {found}, expected {expected}")]
    TopicMismatch {
        peer_review_id: Uuid,
        expected: Uuid,
        found: Uuid,
    },

    #[error("Peer review set of project {found} used to score project {expected}")]
    ProjectMismatch { expected: Uuid, found: Uuid },

    #[error("Peer review {peer_review_id} duplicates another review of the same snapshot")]
    DuplicateReview { peer_review_id: Uuid },

    #[error("Role {role_id} is not an assigned role of project {project_id}")]
    UnknownRole { role_id: Uuid, project_id: Uuid },

    #[error("Review topic {review_topic_id} does not belong to project {project_id}")]
    UnknownReviewTopic {
        review_topic_id: Uuid,
        project_id: Uuid,
    },

    #[error("Milestone {milestone_id} does not belong to project {project_id}")]
    UnknownMilestone {
        milestone_id: Uuid,
        project_id: Uuid,
    },

    #[error("Scores sent by role {sender_role_id} sum to {sum}, expected 1")]
    DistributionSum { sender_role_id: Uuid, sum: f64 },

    #[error("Scores sent by role {sender_role_id} do not cover every other assigned role")]
    IncompleteDistribution { sender_role_id: Uuid },

    #[error("Project {project_id} has no assigned roles to score")]
    NoAssignedRoles { project_id: Uuid },

    #[error("Project cannot go from '{from}' on event '{event}'")]
    InvalidTransition { from: String, event: String },

    #[error("Project {project_id} is in state '{state}', expected '{expected}'")]
    UnexpectedState {
        project_id: Uuid,
        state: String,
        expected: String,
    },

    #[error("Project {project_id} has already been scored for this milestone")]
    AlreadyScored { project_id: Uuid },

    #[error("Role {sender_role_id} already submitted peer reviews for topic {review_topic_id}")]
    AlreadySubmitted {
        sender_role_id: Uuid,
        review_topic_id: Uuid,
    },

    #[error("Concurrent update on project {project_id}")]
    Conflict { project_id: Uuid },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ScoringError {
    /// Errors that mean another caller already finished the same work.
    pub fn is_lost_race(&self) -> bool {
        matches!(self, Self::AlreadyScored { .. } | Self::Conflict { .. })
    }
}
