pub mod lifecycle;
pub mod milestone;
pub mod peer_review;
pub mod project;
pub mod review_topic;
pub mod role;
pub mod role_metric;
pub mod score;

pub use lifecycle::{ProjectEvent, ProjectState, SideEffect, Transition};
pub use milestone::Milestone;
pub use peer_review::PeerReview;
pub use project::Project;
pub use review_topic::ReviewTopic;
pub use role::Role;
pub use role_metric::RoleMetric;
pub use score::{Consensuality, Contribution};
