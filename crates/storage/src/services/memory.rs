use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::store::{ScoringCommit, ScoringStore};
use crate::error::StorageError;
use crate::models::{Milestone, PeerReview, Project, ProjectState, ReviewTopic, Role, RoleMetric};
use crate::scoring::{Result, ScoringError};

#[derive(Default)]
struct State {
    projects: HashMap<Uuid, Project>,
    roles: Vec<Role>,
    topics: Vec<ReviewTopic>,
    milestones: Vec<Milestone>,
    reviews: Vec<PeerReview>,
    metrics: Vec<RoleMetric>,
}

/// [`ScoringStore`] over plain vectors, for service tests.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

pub struct Seeded {
    pub project: Project,
    pub roles: Vec<Role>,
    pub topics: Vec<ReviewTopic>,
}

impl InMemoryStore {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Project with one assigned role per title and one topic per title.
    pub fn seed(&self, state: ProjectState, role_titles: &[&str], topic_titles: &[&str]) -> Seeded {
        let project = Project {
            project_id: Uuid::new_v4(),
            title: "Seeded project".to_string(),
            state,
            version: 0,
            created_at: Utc::now().naive_utc(),
        };

        let roles: Vec<Role> = role_titles
            .iter()
            .map(|title| Role {
                role_id: Uuid::new_v4(),
                project_id: project.project_id,
                assignee_id: Some(Uuid::new_v4()),
                title: title.to_string(),
                description: String::new(),
            })
            .collect();

        let topics: Vec<ReviewTopic> = topic_titles
            .iter()
            .enumerate()
            .map(|(position, title)| ReviewTopic {
                review_topic_id: Uuid::new_v4(),
                project_id: project.project_id,
                title: title.to_string(),
                description: String::new(),
                position: position as i32,
            })
            .collect();

        let mut inner = self.state();
        inner.projects.insert(project.project_id, project.clone());
        inner.roles.extend(roles.iter().cloned());
        inner.topics.extend(topics.iter().cloned());

        Seeded {
            project,
            roles,
            topics,
        }
    }

    pub fn add_milestone(&self, project_id: Uuid) -> Milestone {
        let milestone = Milestone {
            milestone_id: Uuid::new_v4(),
            project_id,
            title: "Sprint".to_string(),
            created_at: Utc::now().naive_utc(),
        };
        self.state().milestones.push(milestone.clone());
        milestone
    }

    pub fn add_review(&self, review: PeerReview) {
        self.state().reviews.push(review);
    }

    pub fn stored_metrics(&self) -> Vec<RoleMetric> {
        self.state().metrics.clone()
    }

    pub fn stored_reviews(&self) -> Vec<PeerReview> {
        self.state().reviews.clone()
    }

    pub fn project_state(&self, project_id: Uuid) -> ProjectState {
        self.state().projects[&project_id].state
    }

    /// Simulates another process changing the project behind our back.
    pub fn bump_version(&self, project_id: Uuid) {
        if let Some(project) = self.state().projects.get_mut(&project_id) {
            project.version += 1;
        }
    }
}

#[async_trait]
impl ScoringStore for InMemoryStore {
    async fn project(&self, project_id: Uuid) -> Result<Project> {
        self.state()
            .projects
            .get(&project_id)
            .cloned()
            .ok_or(ScoringError::Storage(StorageError::NotFound))
    }

    async fn roles(&self, project_id: Uuid) -> Result<Vec<Role>> {
        Ok(self
            .state()
            .roles
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn review_topics(&self, project_id: Uuid) -> Result<Vec<ReviewTopic>> {
        Ok(self
            .state()
            .topics
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn milestone(&self, milestone_id: Uuid) -> Result<Milestone> {
        self.state()
            .milestones
            .iter()
            .find(|m| m.milestone_id == milestone_id)
            .cloned()
            .ok_or(ScoringError::Storage(StorageError::NotFound))
    }

    async fn peer_reviews(&self, project_id: Uuid) -> Result<Vec<PeerReview>> {
        Ok(self
            .state()
            .reviews
            .iter()
            .filter(|r| r.project_id() == project_id)
            .cloned()
            .collect())
    }

    async fn has_submitted(&self, sender_role_id: Uuid, review_topic_id: Uuid) -> Result<bool> {
        Ok(self.state().reviews.iter().any(|r| {
            r.sender_role_id() == sender_role_id && r.review_topic_id() == review_topic_id
        }))
    }

    async fn submitted_pairs(&self, project_id: Uuid) -> Result<BTreeSet<(Uuid, Uuid)>> {
        Ok(self
            .state()
            .reviews
            .iter()
            .filter(|r| r.project_id() == project_id)
            .map(|r| (r.sender_role_id(), r.review_topic_id()))
            .collect())
    }

    async fn insert_peer_reviews(&self, reviews: &[PeerReview]) -> Result<()> {
        self.state().reviews.extend(reviews.iter().cloned());
        Ok(())
    }

    async fn has_role_metrics(&self, project_id: Uuid, milestone_id: Option<Uuid>) -> Result<bool> {
        Ok(self
            .state()
            .metrics
            .iter()
            .any(|m| m.project_id == project_id && m.milestone_id == milestone_id))
    }

    async fn role_metrics(
        &self,
        project_id: Uuid,
        milestone_id: Option<Uuid>,
    ) -> Result<Vec<RoleMetric>> {
        Ok(self
            .state()
            .metrics
            .iter()
            .filter(|m| m.project_id == project_id && m.milestone_id == milestone_id)
            .cloned()
            .collect())
    }

    async fn commit_scoring(&self, commit: ScoringCommit<'_>) -> Result<()> {
        let mut inner = self.state();
        let project_id = commit.project_id;

        let duplicate = commit.metrics.iter().any(|new| {
            inner.metrics.iter().any(|old| {
                old.project_id == new.project_id
                    && old.review_topic_id == new.review_topic_id
                    && old.role_id == new.role_id
                    && old.milestone_id == new.milestone_id
            })
        });
        if duplicate {
            return Err(ScoringError::AlreadyScored { project_id });
        }

        let project = inner
            .projects
            .get_mut(&project_id)
            .ok_or(ScoringError::Storage(StorageError::NotFound))?;
        if project.version != commit.expected_version {
            return Err(ScoringError::Conflict { project_id });
        }
        project.version += 1;
        if let Some(next) = commit.next_state {
            project.state = next;
        }

        inner.metrics.extend(commit.metrics.iter().cloned());
        Ok(())
    }
}
