pub mod aggregator;
pub mod config;
pub mod consensuality;
pub mod contribution;
pub mod error;
pub mod peer_review_set;

pub use aggregator::ReviewTopicAggregator;
pub use config::{ResubmissionPolicy, ScoringConfig};
pub use consensuality::{ConsensualityComputer, ConsensualityReport};
pub use contribution::{ContributionComputer, ContributionMap, RoleContribution};
pub use error::{Result, ScoringError};
pub use peer_review_set::PeerReviewSet;
