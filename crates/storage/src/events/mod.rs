use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::RoleMetric;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event type '{0}' is not registered")]
    Unregistered(&'static str),

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No subscriber is listening for '{0}'")]
    NoSubscriber(&'static str),
}

pub trait DomainEvent: Serialize + Send + Sync {
    const KEY: &'static str;
}

/// A role submitted its peer reviews for one review topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerReviewSubmitted {
    pub project_id: Uuid,
    pub review_topic_id: Uuid,
    pub sender_role_id: Uuid,
    pub submitted_at: NaiveDateTime,
}

impl DomainEvent for PeerReviewSubmitted {
    const KEY: &'static str = "project.peer_review_submitted";
}

/// A scoring pass committed; carries the metrics for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerReviewFinished {
    pub project_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub role_metrics: Vec<RoleMetric>,
}

impl DomainEvent for PeerReviewFinished {
    const KEY: &'static str = "project.peer_review_finished";
}

/// Serialized event ready to hand over to a publisher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub key: &'static str,
    pub payload: serde_json::Value,
    pub occurred_at: NaiveDateTime,
}

/// Explicit mapping from event type to key, populated at startup. Building an
/// envelope for an unregistered type is an error.
pub struct EventRegistry {
    keys: HashMap<&'static str, &'static str>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    /// Registry with every event the services raise.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<PeerReviewSubmitted>();
        registry.register::<PeerReviewFinished>();
        registry
    }

    pub fn register<E: DomainEvent>(&mut self) {
        self.keys.insert(std::any::type_name::<E>(), E::KEY);
    }

    pub fn envelope<E: DomainEvent>(&self, event: &E) -> Result<EventEnvelope, EventError> {
        let key = self
            .keys
            .get(std::any::type_name::<E>())
            .copied()
            .ok_or(EventError::Unregistered(E::KEY))?;

        Ok(EventEnvelope {
            event_id: Uuid::new_v4(),
            key,
            payload: serde_json::to_value(event)?,
            occurred_at: Utc::now().naive_utc(),
        })
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), EventError>;
}

/// In-process fan-out over a broadcast channel.
///
/// Consumers such as notification or mail senders call [`subscribe`] and
/// receive every envelope published after that point.
///
/// [`subscribe`]: BroadcastPublisher::subscribe
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<EventEnvelope>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), EventError> {
        let key = envelope.key;
        let event_id = envelope.event_id;

        match self.sender.send(envelope) {
            Ok(receivers) => {
                tracing::info!(%event_id, key, receivers, "Published domain event");
                Ok(())
            }
            Err(_) => {
                tracing::debug!(%event_id, key, "Domain event dropped, nobody subscribed");
                Err(EventError::NoSubscriber(key))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted() -> PeerReviewSubmitted {
        PeerReviewSubmitted {
            project_id: Uuid::new_v4(),
            review_topic_id: Uuid::new_v4(),
            sender_role_id: Uuid::new_v4(),
            submitted_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_default_registry_knows_every_event() {
        let registry = EventRegistry::with_defaults();
        let finished = PeerReviewFinished {
            project_id: Uuid::new_v4(),
            milestone_id: None,
            role_metrics: Vec::new(),
        };
        assert_eq!(
            registry.envelope(&finished).unwrap().key,
            "project.peer_review_finished"
        );
        assert_eq!(
            registry.envelope(&submitted()).unwrap().key,
            "project.peer_review_submitted"
        );
    }

    #[test]
    fn test_unregistered_event_is_rejected() {
        let registry = EventRegistry::new();
        let result = registry.envelope(&submitted());
        assert!(matches!(result, Err(EventError::Unregistered(_))));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let registry = EventRegistry::with_defaults();
        let publisher = BroadcastPublisher::default();
        let mut receiver = publisher.subscribe();

        let event = submitted();
        let envelope = registry.envelope(&event).unwrap();
        publisher.publish(envelope).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.key, PeerReviewSubmitted::KEY);
        let payload: PeerReviewSubmitted = serde_json::from_value(received.payload).unwrap();
        assert_eq!(payload, event);
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_fails() {
        let registry = EventRegistry::with_defaults();
        let publisher = BroadcastPublisher::default();

        let envelope = registry.envelope(&submitted()).unwrap();
        let result = publisher.publish(envelope).await;
        assert!(matches!(result, Err(EventError::NoSubscriber(_))));
    }
}
