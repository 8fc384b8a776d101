use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::config::{AppConfig, LinearConfig};
use crate::markdown::document::TableMarkers;
use crate::providers::linear::LinearProvider;
use crate::providers::IssueProvider;
use crate::sync::actions::ActionSync;
use crate::sync::email::{EmailOutcome, EmailSync};
use crate::sync::{annotate_file, sync_file};
use crate::util::files::markdown_files;

#[derive(Debug, Parser)]
#[command(
    name = "notesync",
    version,
    about = "Sync markdown meeting notes and email notes with Linear"
)]
pub struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file (default: ~/.notesync/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create Linear issues for action items that have no link yet
    Sync {
        /// Meeting notes to process (default: every note in the meeting notes directory)
        files: Vec<PathBuf>,

        /// Also file the whole note as one backlog issue in the summary project
        #[arg(long)]
        summary_issue: bool,
    },
    /// Strike through action items whose issues are completed or canceled
    Status {
        /// Meeting notes to check (default: every note in the meeting notes directory)
        files: Vec<PathBuf>,
    },
    /// Create or update one Linear issue per email note
    Email,
    /// Print teams and workflow states
    Info,
    /// List open issues
    Issues,
}

pub async fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    // Credentials are checked before any file is touched.
    let linear = config.linear()?;
    let provider = LinearProvider::new(linear);

    match &cli.command {
        Commands::Sync {
            files,
            summary_issue,
        } => handle_sync(&provider, linear, config, files, *summary_issue).await,
        Commands::Status { files } => handle_status(&provider, config, files).await,
        Commands::Email => handle_email(&provider, linear, config).await,
        Commands::Info => handle_info(&provider).await,
        Commands::Issues => handle_issues(&provider).await,
    }
}

/// Explicit files win; otherwise every note in the meeting notes directory.
fn target_files(files: &[PathBuf], config: &AppConfig) -> Result<Vec<PathBuf>> {
    if !files.is_empty() {
        return Ok(files.to_vec());
    }
    let dir = &config.meeting.notes_dir;
    let found = markdown_files(dir)?;
    info!(dir = %dir.display(), count = found.len(), "Found markdown files");
    Ok(found)
}

async fn resolve_team_id(linear: &LinearConfig, provider: &dyn IssueProvider) -> Result<String> {
    if let Some(team_id) = &linear.team_id {
        return Ok(team_id.clone());
    }
    let team = provider
        .first_team()
        .await?
        .context("Could not find a team in Linear. Set LINEAR_TEAM_ID")?;
    info!(team = %team.name, "LINEAR_TEAM_ID not set, using first team");
    Ok(team.id)
}

fn markers(config: &AppConfig) -> TableMarkers {
    TableMarkers {
        project: config.meeting.project_marker.clone(),
        link: config.meeting.link_marker.clone(),
    }
}

async fn handle_sync(
    provider: &dyn IssueProvider,
    linear: &LinearConfig,
    config: &AppConfig,
    files: &[PathBuf],
    summary_issue: bool,
) -> Result<()> {
    let files = target_files(files, config)?;
    let team_id = resolve_team_id(linear, provider).await?;
    let projects = provider.projects().await?;
    info!(count = projects.len(), "Found projects in Linear");

    let markers = markers(config);
    let actions = ActionSync {
        provider,
        projects: &projects,
        team_id: &team_id,
        state_id: Some(linear.backlog_state_id.as_str()),
        markers: &markers,
    };
    let summary_project = summary_issue.then_some(config.meeting.summary_project.as_str());

    for path in &files {
        let report = sync_file(path, &actions, summary_project).await?;
        if !report.table_found {
            println!("{}: no Action Items table found", path.display());
        } else if report.created.is_empty() {
            println!("{}: no new issues created", path.display());
        } else {
            println!(
                "{}: added {} Linear link(s): {}",
                path.display(),
                report.created.len(),
                report.created.join(", ")
            );
        }
        if report.malformed > 0 {
            println!(
                "{}: skipped {} malformed row(s)",
                path.display(),
                report.malformed
            );
        }
    }
    Ok(())
}

async fn handle_status(
    provider: &dyn IssueProvider,
    config: &AppConfig,
    files: &[PathBuf],
) -> Result<()> {
    let files = target_files(files, config)?;
    for path in &files {
        let report = annotate_file(path, provider).await?;
        if report.linked == 0 {
            continue;
        }
        if report.struck.is_empty() {
            println!("{}: no updates needed", path.display());
        } else {
            println!(
                "{}: marked {} item(s) done: {}",
                path.display(),
                report.struck.len(),
                report.struck.join(", ")
            );
        }
    }
    Ok(())
}

async fn handle_email(
    provider: &dyn IssueProvider,
    linear: &LinearConfig,
    config: &AppConfig,
) -> Result<()> {
    let dir = &config.email.notes_dir;
    let files = markdown_files(dir)?;
    if files.is_empty() {
        println!("No email notes found in {}", dir.display());
        return Ok(());
    }
    info!(count = files.len(), "Email notes to sync");

    let team_id = resolve_team_id(linear, provider).await?;
    let email = EmailSync {
        provider,
        team_id: &team_id,
        state_id: Some(linear.backlog_state_id.as_str()),
    };

    for path in &files {
        let name = path.display();
        match email.sync_note(path).await? {
            EmailOutcome::Created(issue) => {
                println!("{name}: created {} ({})", issue.identifier, issue.url)
            }
            EmailOutcome::Updated(identifier) => println!("{name}: updated {identifier}"),
            EmailOutcome::Skipped(reason) => println!("{name}: skipped ({reason})"),
        }
    }
    Ok(())
}

async fn handle_info(provider: &LinearProvider) -> Result<()> {
    let info = provider.workspace_info().await?;

    println!("--- Teams ---");
    for team in &info.teams {
        println!("Name: {}, Key: {}, ID: {}", team.name, team.key, team.id);
    }

    println!("\n--- Workflow States ---");
    for state in &info.states {
        let team = state.team.as_ref().map(|t| t.name.as_str()).unwrap_or("-");
        println!(
            "Name: {}, Type: {}, Team: {}, ID: {}",
            state.name, state.kind, team, state.id
        );
    }
    Ok(())
}

async fn handle_issues(provider: &LinearProvider) -> Result<()> {
    let issues = provider.open_issues().await?;
    println!("Found {} issues:", issues.len());
    for issue in &issues {
        let state = issue.state.as_ref().map(|s| s.name.as_str()).unwrap_or("-");
        let assignee = issue
            .assignee
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or("Unassigned");
        println!("- [{}] {} ({state}) - {assignee}", issue.identifier, issue.title);
    }
    Ok(())
}
