use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use storage::Database;
use storage::models::{Milestone, Project, ProjectEvent, ProjectState, ReviewTopic, Role};
use storage::repository::milestone::MilestoneRepository;
use storage::repository::project::ProjectRepository;
use storage::repository::review_topic::ReviewTopicRepository;
use storage::repository::role::RoleRepository;
use storage::services::ProjectScoringService;
use uuid::Uuid;

/// Project description loaded from a JSON file.
#[derive(Debug, Deserialize)]
pub struct ProjectSetup {
    pub title: String,
    pub roles: Vec<RoleSetup>,
    pub review_topics: Vec<TopicSetup>,
    #[serde(default)]
    pub milestones: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleSetup {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TopicSetup {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectOverview {
    pub project: Project,
    pub roles: Vec<Role>,
    pub review_topics: Vec<ReviewTopic>,
    pub milestones: Vec<Milestone>,
}

impl ProjectSetup {
    pub fn check(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("Project title is required");
        }
        if self.roles.iter().any(|r| r.title.trim().is_empty()) {
            bail!("Every role needs a title");
        }
        if self.review_topics.iter().any(|t| t.title.trim().is_empty()) {
            bail!("Every review topic needs a title");
        }
        Ok(())
    }
}

/// Creates the project and everything it owns in one transaction; nothing is
/// kept when any insert fails.
pub async fn create_project(database: &Database, setup: ProjectSetup) -> Result<ProjectOverview> {
    setup.check()?;

    let mut tx = database.pool().begin().await?;

    let project = ProjectRepository::create(&mut *tx, &setup.title)
        .await
        .context("Failed to create project")?;

    for role in &setup.roles {
        RoleRepository::create(
            &mut *tx,
            project.project_id,
            &role.title,
            &role.description,
            role.assignee_id,
        )
        .await
        .with_context(|| format!("Failed to create role '{}'", role.title))?;
    }

    for (position, topic) in setup.review_topics.iter().enumerate() {
        ReviewTopicRepository::create(
            &mut *tx,
            project.project_id,
            &topic.title,
            &topic.description,
            position as i32,
        )
        .await
        .with_context(|| format!("Failed to create review topic '{}'", topic.title))?;
    }

    for title in &setup.milestones {
        MilestoneRepository::create(&mut *tx, project.project_id, title)
            .await
            .with_context(|| format!("Failed to create milestone '{}'", title))?;
    }

    tx.commit().await?;
    tracing::info!(project_id = %project.project_id, "Created project '{}'", project.title);

    overview(database, project.project_id).await
}

pub async fn overview(database: &Database, project_id: Uuid) -> Result<ProjectOverview> {
    let pool = database.pool();

    Ok(ProjectOverview {
        project: ProjectRepository::new(pool).find_by_id(project_id).await?,
        roles: RoleRepository::new(pool).list_for_project(project_id).await?,
        review_topics: ReviewTopicRepository::new(pool)
            .list_for_project(project_id)
            .await?,
        milestones: MilestoneRepository::new(pool)
            .list_for_project(project_id)
            .await?,
    })
}

/// Applies a lifecycle event. Leaving peer review goes through scoring so the
/// metrics and the transition are committed together.
pub async fn advance(
    database: &Database,
    scoring: &ProjectScoringService,
    project_id: Uuid,
    event: ProjectEvent,
) -> Result<ProjectState> {
    if event == ProjectEvent::FinishPeerReview {
        let outcome = scoring.score(project_id, None).await?;
        return Ok(outcome.state);
    }

    let project = ProjectRepository::new(database.pool())
        .find_by_id(project_id)
        .await?;
    let transition = project.state.transition(event)?;

    let mut conn = database.pool().acquire().await?;
    let updated = ProjectRepository::update_state(
        &mut *conn,
        project_id,
        project.version,
        Some(transition.next),
    )
    .await?;

    tracing::info!(
        project_id = %project_id,
        from = %project.state,
        to = %updated.state,
        effects = ?transition.effects,
        "Project advanced"
    );

    Ok(updated.state)
}
