mod config;
mod setup;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use storage::Database;
use storage::events::{BroadcastPublisher, EventRegistry};
use storage::models::ProjectEvent;
use storage::repository::scoring_store::PgScoringStore;
use storage::services::{PeerReviewService, Submission};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::config::Settings;
use crate::setup::ProjectSetup;

#[derive(Parser)]
#[command(name = "peer-score")]
#[command(about = "Peer review scoring for project roles", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: Settings,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the embedded database migrations
    Migrate,
    /// Score a project, or one of its milestones, and store the metrics
    Score {
        #[arg(long)]
        project: Uuid,

        #[arg(long)]
        milestone: Option<Uuid>,
    },
    /// Compute the metrics a project would get now, without storing them
    Preview {
        #[arg(long)]
        project: Uuid,
    },
    /// List stored metrics
    Metrics {
        #[arg(long)]
        project: Uuid,

        #[arg(long)]
        milestone: Option<Uuid>,
    },
    /// Submit one role's peer reviews from a JSON file
    Submit { file: PathBuf },
    /// Create a project with its roles, review topics and milestones from a JSON file
    CreateProject { file: PathBuf },
    /// Show a project with its roles, review topics and milestones
    Project {
        #[arg(long)]
        project: Uuid,
    },
    /// Apply a lifecycle event (finish-formation, finish-peer-review, finish-manager-review)
    Advance {
        #[arg(long)]
        project: Uuid,

        #[arg(long)]
        event: ProjectEvent,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("peer_score={},storage={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let scoring_config = cli.settings.scoring_config()?;

    tracing::info!("Connecting to database...");
    let database =
        Database::with_max_connections(&cli.settings.database_url, cli.settings.max_connections)
            .await
            .context("Failed to connect to the database")?;

    if let Commands::Migrate = cli.command {
        database
            .run_migrations()
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Migrations applied");
        return Ok(());
    }

    let store = Arc::new(PgScoringStore::new(database.pool().clone()));
    let registry = Arc::new(EventRegistry::with_defaults());
    let publisher = BroadcastPublisher::default();
    spawn_event_logger(&publisher);

    let reviews = PeerReviewService::new(
        store,
        scoring_config,
        registry,
        Arc::new(publisher),
    );
    let scoring = reviews.scoring();

    match cli.command {
        Commands::Migrate => {}
        Commands::Score { project, milestone } => {
            let outcome = scoring
                .score(project, milestone)
                .await
                .with_context(|| format!("Failed to score project {}", project))?;
            print_json(&outcome)?;
        }
        Commands::Preview { project } => {
            let metrics = scoring
                .preview(project)
                .await
                .with_context(|| format!("Failed to preview project {}", project))?;
            print_json(&metrics)?;
        }
        Commands::Metrics { project, milestone } => {
            let metrics = scoring.metrics(project, milestone).await?;
            if metrics.is_empty() {
                tracing::warn!(project_id = %project, "No stored metrics for this scope");
            }
            print_json(&metrics)?;
        }
        Commands::Submit { file } => {
            handle_submit(&reviews, file).await?;
        }
        Commands::CreateProject { file } => {
            tracing::info!("Loading project from: {}", file.display());
            let json_content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let project_setup: ProjectSetup =
                serde_json::from_str(&json_content).context("Invalid project JSON")?;

            let overview = setup::create_project(&database, project_setup).await?;
            print_json(&overview)?;
        }
        Commands::Project { project } => {
            print_json(&setup::overview(&database, project).await?)?;
        }
        Commands::Advance { project, event } => {
            let state = setup::advance(&database, scoring, project, event).await?;
            print_json(&state)?;
        }
    }

    Ok(())
}

async fn handle_submit(service: &PeerReviewService, file: PathBuf) -> Result<()> {
    tracing::info!("Loading submission from: {}", file.display());

    let json_content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Cannot read {}", file.display()))?;
    let submission: Submission =
        serde_json::from_str(&json_content).context("Invalid submission JSON")?;

    let outcome = service.submit(submission).await?;
    print_json(&outcome)
}

/// Keeps one subscriber on the channel so events are logged rather than
/// dropped.
fn spawn_event_logger(publisher: &BroadcastPublisher) {
    let mut events = publisher.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(envelope) => {
                    tracing::debug!(
                        event_id = %envelope.event_id,
                        key = envelope.key,
                        payload = %envelope.payload,
                        "Domain event"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
