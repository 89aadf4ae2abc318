use anyhow::{Result, ensure};
use storage::scoring::{ResubmissionPolicy, ScoringConfig};

/// Connection and scoring settings, read from flags or the environment.
#[derive(Debug, Clone, clap::Args)]
pub struct Settings {
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Allowed drift when checking that a distribution sums to 1
    #[arg(long, env = "SCORING_SUM_EPSILON", default_value_t = 1e-4)]
    pub sum_epsilon: f64,

    /// Disagreement at or above which a role is flagged as cliquey
    #[arg(long, env = "SCORING_CLIQUISM_THRESHOLD", default_value_t = 0.2)]
    pub cliquism_threshold: f64,

    #[arg(long, env = "RESUBMISSION_POLICY", default_value_t = ResubmissionPolicy::LatestWins)]
    pub resubmission_policy: ResubmissionPolicy,
}

impl Settings {
    pub fn scoring_config(&self) -> Result<ScoringConfig> {
        ensure!(
            self.sum_epsilon.is_finite() && self.sum_epsilon >= 0.0,
            "SCORING_SUM_EPSILON must be a non-negative number, got {}",
            self.sum_epsilon
        );
        ensure!(
            (0.0..=1.0).contains(&self.cliquism_threshold),
            "SCORING_CLIQUISM_THRESHOLD must be between 0 and 1, got {}",
            self.cliquism_threshold
        );
        ensure!(
            self.max_connections > 0,
            "DATABASE_MAX_CONNECTIONS must be at least 1"
        );

        Ok(ScoringConfig {
            sum_epsilon: self.sum_epsilon,
            cliquism_threshold: self.cliquism_threshold,
            resubmission_policy: self.resubmission_policy,
        })
    }
}
