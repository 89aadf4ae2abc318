pub mod locks;
pub mod peer_review;
pub mod project_scoring;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use locks::ProjectLocks;
pub use peer_review::{PeerReviewService, PeerScore, Submission, SubmissionOutcome};
pub use project_scoring::{ProjectScoringService, ScoringOutcome};
pub use store::{ScoringCommit, ScoringStore};

use crate::events::{DomainEvent, EventPublisher, EventRegistry};

/// Events are published after the data they describe is committed; a failed
/// publication is logged and does not undo the commit.
pub(crate) async fn publish_event<E: DomainEvent>(
    registry: &EventRegistry,
    publisher: &dyn EventPublisher,
    event: &E,
) {
    let envelope = match registry.envelope(event) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(key = E::KEY, "Failed to build domain event: {}", e);
            return;
        }
    };

    if let Err(e) = publisher.publish(envelope).await {
        tracing::warn!(key = E::KEY, "Domain event not delivered: {}", e);
    }
}
