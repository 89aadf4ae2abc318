use serde::{Deserialize, Serialize};

use crate::scoring::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    Formation,
    PeerReview,
    ManagerReview,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectEvent {
    FinishFormation,
    FinishPeerReview,
    FinishManagerReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    /// Compute and persist role metrics for every review topic
    ComputeRoleMetrics,
    /// Let project members know the project entered a new phase
    NotifyMembers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ProjectState,
    pub effects: &'static [SideEffect],
}

/// `formation -> peer_review -> manager_review -> finished`, with the side
/// effects the caller runs on each step.
const TRANSITIONS: &[(ProjectState, ProjectEvent, Transition)] = &[
    (
        ProjectState::Formation,
        ProjectEvent::FinishFormation,
        Transition {
            next: ProjectState::PeerReview,
            effects: &[SideEffect::NotifyMembers],
        },
    ),
    (
        ProjectState::PeerReview,
        ProjectEvent::FinishPeerReview,
        Transition {
            next: ProjectState::ManagerReview,
            effects: &[SideEffect::ComputeRoleMetrics, SideEffect::NotifyMembers],
        },
    ),
    (
        ProjectState::ManagerReview,
        ProjectEvent::FinishManagerReview,
        Transition {
            next: ProjectState::Finished,
            effects: &[SideEffect::NotifyMembers],
        },
    ),
];

impl ProjectState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formation => "formation",
            Self::PeerReview => "peer_review",
            Self::ManagerReview => "manager_review",
            Self::Finished => "finished",
        }
    }

    pub fn all() -> &'static [ProjectState] {
        &[
            Self::Formation,
            Self::PeerReview,
            Self::ManagerReview,
            Self::Finished,
        ]
    }

    pub fn transition(self, event: ProjectEvent) -> Result<Transition, ScoringError> {
        TRANSITIONS
            .iter()
            .find(|(state, ev, _)| *state == self && *ev == event)
            .map(|(_, _, transition)| *transition)
            .ok_or_else(|| ScoringError::InvalidTransition {
                from: self.to_string(),
                event: event.to_string(),
            })
    }

    fn parse_str(s: &str) -> Result<Self, String> {
        let normalized = s.to_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unknown project state: '{}'. Available: {}",
                    s,
                    Self::all()
                        .iter()
                        .map(|state| state.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

impl TryFrom<&str> for ProjectState {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse_str(value)
    }
}

impl std::str::FromStr for ProjectState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl std::fmt::Display for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ProjectEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinishFormation => "finish_formation",
            Self::FinishPeerReview => "finish_peer_review",
            Self::FinishManagerReview => "finish_manager_review",
        }
    }

    pub fn all() -> &'static [ProjectEvent] {
        &[
            Self::FinishFormation,
            Self::FinishPeerReview,
            Self::FinishManagerReview,
        ]
    }
}

impl std::str::FromStr for ProjectEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|event| event.as_str() == normalized)
            .ok_or_else(|| format!("Unknown project event: '{}'", s))
    }
}

impl std::fmt::Display for ProjectEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
