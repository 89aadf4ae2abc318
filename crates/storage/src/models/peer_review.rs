use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::ScoringError;

/// A directed, topic-scoped score one role gives another.
///
/// Built through [`PeerReview::new`], deserialization included, so a value of
/// this type never describes a self-review or a score outside `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PeerReviewRecord")]
pub struct PeerReview {
    peer_review_id: Uuid,
    project_id: Uuid,
    review_topic_id: Uuid,
    sender_role_id: Uuid,
    receiver_role_id: Uuid,
    score: f64,
    submitted_at: NaiveDateTime,
}

/// Unchecked wire shape of a [`PeerReview`].
#[derive(Deserialize)]
struct PeerReviewRecord {
    peer_review_id: Uuid,
    project_id: Uuid,
    review_topic_id: Uuid,
    sender_role_id: Uuid,
    receiver_role_id: Uuid,
    score: f64,
    submitted_at: NaiveDateTime,
}

impl TryFrom<PeerReviewRecord> for PeerReview {
    type Error = ScoringError;

    fn try_from(record: PeerReviewRecord) -> Result<Self, Self::Error> {
        Ok(PeerReview::new(
            record.project_id,
            record.review_topic_id,
            record.sender_role_id,
            record.receiver_role_id,
            record.score,
        )?
        .with_id(record.peer_review_id)
        .with_submitted_at(record.submitted_at))
    }
}

impl PeerReview {
    pub fn new(
        project_id: Uuid,
        review_topic_id: Uuid,
        sender_role_id: Uuid,
        receiver_role_id: Uuid,
        score: f64,
    ) -> Result<Self, ScoringError> {
        if sender_role_id == receiver_role_id {
            return Err(ScoringError::SelfReview {
                role_id: sender_role_id,
            });
        }
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(ScoringError::ScoreOutOfRange { score });
        }

        Ok(Self {
            peer_review_id: Uuid::new_v4(),
            project_id,
            review_topic_id,
            sender_role_id,
            receiver_role_id,
            score,
            submitted_at: Utc::now().naive_utc(),
        })
    }

    pub fn with_id(mut self, peer_review_id: Uuid) -> Self {
        self.peer_review_id = peer_review_id;
        self
    }

    pub fn with_submitted_at(mut self, submitted_at: NaiveDateTime) -> Self {
        self.submitted_at = submitted_at;
        self
    }

    pub fn peer_review_id(&self) -> Uuid {
        self.peer_review_id
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn review_topic_id(&self) -> Uuid {
        self.review_topic_id
    }

    pub fn sender_role_id(&self) -> Uuid {
        self.sender_role_id
    }

    pub fn receiver_role_id(&self) -> Uuid {
        self.receiver_role_id
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn submitted_at(&self) -> NaiveDateTime {
        self.submitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_review_is_rejected_for_any_value() {
        let project = Uuid::new_v4();
        let topic = Uuid::new_v4();
        let role = Uuid::new_v4();

        for score in [0.0, 0.3, 1.0, 2.0, f64::NAN] {
            let result = PeerReview::new(project, topic, role, role, score);
            assert!(matches!(result, Err(ScoringError::SelfReview { .. })));
        }
    }

    #[test]
    fn test_score_range() {
        let project = Uuid::new_v4();
        let topic = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(PeerReview::new(project, topic, a, b, 0.0).is_ok());
        assert!(PeerReview::new(project, topic, a, b, 1.0).is_ok());
        assert!(matches!(
            PeerReview::new(project, topic, a, b, 1.2),
            Err(ScoringError::ScoreOutOfRange { .. })
        ));
        assert!(PeerReview::new(project, topic, a, b, f64::NAN).is_err());
    }

    fn record(sender: Uuid, receiver: Uuid, score: f64) -> serde_json::Value {
        serde_json::json!({
            "peer_review_id": Uuid::new_v4(),
            "project_id": Uuid::new_v4(),
            "review_topic_id": Uuid::new_v4(),
            "sender_role_id": sender,
            "receiver_role_id": receiver,
            "score": score,
            "submitted_at": "2025-03-14T09:30:00",
        })
    }

    #[test]
    fn test_deserialization_goes_through_checks() {
        let role = Uuid::new_v4();

        let self_review = serde_json::from_value::<PeerReview>(record(role, role, 0.5));
        assert!(self_review.is_err());

        let out_of_range = serde_json::from_value::<PeerReview>(record(role, Uuid::new_v4(), 1.5));
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_deserialization_keeps_id_and_timestamp() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let value = record(a, b, 0.25);

        let review: PeerReview = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(review.peer_review_id().to_string(), value["peer_review_id"]);
        assert_eq!(review.sender_role_id(), a);
        assert_eq!(review.score(), 0.25);
        assert_eq!(review.submitted_at().to_string(), "2025-03-14 09:30:00");
    }
}
