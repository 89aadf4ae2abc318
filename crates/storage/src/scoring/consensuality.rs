use std::collections::BTreeMap;

use uuid::Uuid;

use super::error::Result;
use super::peer_review_set::PeerReviewSet;
use crate::models::Consensuality;

/// Agreement between reviewers for one review topic.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensualityReport {
    pub consensuality: Consensuality,
    /// Receivers reviewed by at least two senders
    pub eligible_receivers: usize,
    /// Per-receiver disagreement in `[0, 1]`, eligible receivers only
    pub disagreement: BTreeMap<Uuid, f64>,
    cliquism_threshold: f64,
}

impl ConsensualityReport {
    fn full_agreement(cliquism_threshold: f64) -> Self {
        Self {
            consensuality: Consensuality::FULL,
            eligible_receivers: 0,
            disagreement: BTreeMap::new(),
            cliquism_threshold,
        }
    }

    /// Whether reviewers split on this role. `None` when fewer than two
    /// senders reviewed it.
    pub fn is_cliquey(&self, role_id: Uuid) -> Option<bool> {
        self.disagreement
            .get(&role_id)
            .map(|d| *d >= self.cliquism_threshold)
    }

    pub fn cliquey_roles(&self) -> Vec<Uuid> {
        self.disagreement
            .iter()
            .filter(|(_, d)| **d >= self.cliquism_threshold)
            .map(|(role_id, _)| *role_id)
            .collect()
    }
}

/// Measures how much senders agree about each receiver.
///
/// The disagreement about a receiver is four times the population variance
/// of the scores it received, which maps scores in `[0, 1]` onto `[0, 1]`.
/// Consensuality is one minus the mean disagreement over receivers with at
/// least two scores.
#[derive(Debug, Clone, Copy)]
pub struct ConsensualityComputer {
    cliquism_threshold: f64,
}

impl ConsensualityComputer {
    pub fn new(cliquism_threshold: f64) -> Self {
        Self { cliquism_threshold }
    }

    pub fn compute(&self, reviews: &PeerReviewSet) -> Result<ConsensualityReport> {
        if reviews.is_empty() {
            return Ok(ConsensualityReport::full_agreement(self.cliquism_threshold));
        }

        let mut scores: BTreeMap<Uuid, Vec<f64>> = BTreeMap::new();
        for review in reviews.iter() {
            scores
                .entry(review.receiver_role_id())
                .or_default()
                .push(review.score());
        }

        let disagreement: BTreeMap<Uuid, f64> = scores
            .into_iter()
            .filter(|(_, received)| received.len() >= 2)
            .map(|(role_id, received)| (role_id, disagreement(&received)))
            .collect();

        if disagreement.is_empty() {
            return Ok(ConsensualityReport::full_agreement(self.cliquism_threshold));
        }

        let mean = disagreement.values().sum::<f64>() / disagreement.len() as f64;
        let consensuality = Consensuality::new((1.0 - mean).clamp(0.0, 1.0))?;

        Ok(ConsensualityReport {
            consensuality,
            eligible_receivers: disagreement.len(),
            disagreement,
            cliquism_threshold: self.cliquism_threshold,
        })
    }
}

fn disagreement(scores: &[f64]) -> f64 {
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

    (4.0 * variance).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::test_support::review;

    const THRESHOLD: f64 = 0.2;

    fn computer() -> ConsensualityComputer {
        ConsensualityComputer::new(THRESHOLD)
    }

    #[test]
    fn test_empty_set_is_full_agreement() {
        let set = PeerReviewSet::empty(Uuid::new_v4());
        let report = computer().compute(&set).unwrap();

        assert_eq!(report.consensuality, Consensuality::FULL);
        assert_eq!(report.eligible_receivers, 0);
    }

    #[test]
    fn test_identical_scores_are_full_agreement() {
        let project = Uuid::new_v4();
        let topic = Uuid::new_v4();
        let roles: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        let mut reviews = Vec::new();
        for &from in &roles {
            for &to in &roles {
                if from != to {
                    reviews.push(review(project, topic, from, to, 1.0 / 3.0));
                }
            }
        }
        let set = PeerReviewSet::new(project, reviews).unwrap();

        let report = computer().compute(&set).unwrap();
        assert_eq!(report.consensuality.value(), 1.0);
        assert_eq!(report.eligible_receivers, 4);
        assert!(report.cliquey_roles().is_empty());
    }

    #[test]
    fn test_split_opinion_lowers_consensuality() {
        let project = Uuid::new_v4();
        let topic = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        // b and c disagree completely about a and agree about each other.
        let set = PeerReviewSet::new(
            project,
            vec![
                review(project, topic, a, b, 1.0),
                review(project, topic, a, c, 0.0),
                review(project, topic, b, a, 1.0),
                review(project, topic, b, c, 0.0),
                review(project, topic, c, a, 0.0),
                review(project, topic, c, b, 1.0),
            ],
        )
        .unwrap();

        let report = computer().compute(&set).unwrap();

        assert!(report.consensuality.value() < 1.0);
        assert_eq!(report.disagreement[&a], 1.0);
        assert_eq!(report.disagreement[&c], 0.0);
        assert_eq!(report.is_cliquey(a), Some(true));
        assert_eq!(report.is_cliquey(c), Some(false));
        assert!((report.consensuality.value() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_reviewer_receivers_are_excluded() {
        let project = Uuid::new_v4();
        let topic = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let set = PeerReviewSet::new(
            project,
            vec![
                review(project, topic, a, b, 1.0),
                review(project, topic, b, a, 1.0),
            ],
        )
        .unwrap();

        let report = computer().compute(&set).unwrap();

        assert_eq!(report.eligible_receivers, 0);
        assert_eq!(report.consensuality, Consensuality::FULL);
        assert_eq!(report.is_cliquey(a), None);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let project = Uuid::new_v4();
        let topic = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let set = PeerReviewSet::new(
            project,
            vec![
                review(project, topic, a, b, 0.3),
                review(project, topic, a, c, 0.7),
                review(project, topic, b, a, 0.6),
                review(project, topic, b, c, 0.4),
                review(project, topic, c, a, 0.1),
                review(project, topic, c, b, 0.9),
            ],
        )
        .unwrap();

        let first = computer().compute(&set).unwrap();
        let second = computer().compute(&set).unwrap();

        assert_eq!(
            first.consensuality.value().to_bits(),
            second.consensuality.value().to_bits()
        );
        assert_eq!(first.disagreement, second.disagreement);
    }
}
