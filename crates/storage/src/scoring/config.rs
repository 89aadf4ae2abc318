use serde::{Deserialize, Serialize};

/// What happens when a role submits peer reviews for a topic twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResubmissionPolicy {
    /// The newer snapshot supersedes the older one
    #[default]
    LatestWins,
    /// The second submission is refused
    Reject,
}

impl ResubmissionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LatestWins => "latest-wins",
            Self::Reject => "reject",
        }
    }
}

impl std::str::FromStr for ResubmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "latest-wins" | "latest" => Ok(Self::LatestWins),
            "reject" => Ok(Self::Reject),
            _ => Err(format!(
                "Unknown resubmission policy: '{}'. Available: latest-wins, reject",
                s
            )),
        }
    }
}

impl std::fmt::Display for ResubmissionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tunables of a scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Allowed drift when checking that a sender's scores sum to 1
    pub sum_epsilon: f64,
    /// Disagreement at or above which a receiver is flagged as cliquey
    pub cliquism_threshold: f64,
    pub resubmission_policy: ResubmissionPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            sum_epsilon: 1e-4,
            cliquism_threshold: 0.2,
            resubmission_policy: ResubmissionPolicy::default(),
        }
    }
}
