//! Implementation of the `taskdeps deps` commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::build_services;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{
    parse_task_id, Config, CreateDependencyRequest, DeleteDependencyRequest, DependencyEdge, DependencyEntry,
    DependencyView, TenantContext,
};

/// Arguments for `taskdeps deps`.
#[derive(Args, Debug)]
pub struct DepsArgs {
    #[command(subcommand)]
    pub command: DepsCommand,
}

/// Dependency subcommands.
#[derive(Subcommand, Debug)]
pub enum DepsCommand {
    /// Show what a task blocks and what blocks it
    Show {
        task_id: String,
        /// Act as a member of this team
        #[arg(long)]
        team: Option<Uuid>,
    },
    /// Make BLOCKER_ID a prerequisite of BLOCKED_ID
    Add {
        blocker_id: String,
        blocked_id: String,
        #[arg(long)]
        team: Option<Uuid>,
    },
    /// Remove a dependency (no error if it does not exist)
    Remove {
        blocker_id: String,
        blocked_id: String,
        #[arg(long)]
        team: Option<Uuid>,
    },
}

/// Result of `deps show`.
#[derive(Debug, Serialize)]
pub struct ShowOutput {
    pub task_id: Uuid,
    #[serde(flatten)]
    pub view: DependencyView,
}

fn format_entries(title: &str, entries: &[DependencyEntry], other: impl Fn(&DependencyEntry) -> Uuid) -> Vec<String> {
    let mut lines = vec![format!("{title} ({}):", entries.len())];
    if entries.is_empty() {
        lines.push("  (none)".to_string());
    }
    for entry in entries {
        lines.push(format!(
            "  {}  {:<11}  {}",
            other(entry),
            entry.task_status.as_str(),
            truncate(&entry.task_text, 60)
        ));
    }
    lines
}

impl CommandOutput for ShowOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Task {}", self.task_id)];
        lines.push(format!("  Blocked: {}", if self.view.is_blocked { "yes" } else { "no" }));
        lines.push(String::new());
        lines.extend(format_entries("Blocked by", &self.view.blocked_by, |e| e.blocker_id));
        lines.push(String::new());
        lines.extend(format_entries("Blocks", &self.view.blocks, |e| e.blocked_id));
        lines.join("\n")
    }
}

/// What a `deps add`/`deps remove` did to the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeAction {
    Created,
    Removed,
}

/// Result of `deps add` and `deps remove`.
#[derive(Debug, Serialize)]
pub struct EdgeOutput {
    pub action: EdgeAction,
    pub blocker_id: String,
    pub blocked_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<DependencyEdge>,
}

impl CommandOutput for EdgeOutput {
    fn to_human(&self) -> String {
        match self.action {
            EdgeAction::Created => format!("Dependency created: {} blocks {}", self.blocker_id, self.blocked_id),
            EdgeAction::Removed => format!("Dependency removed: {} no longer blocks {}", self.blocker_id, self.blocked_id),
        }
    }
}

/// Run a `deps` subcommand against the configured database.
pub async fn execute(args: DepsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let (queries, mutations) = build_services(config).await?;

    match args.command {
        DepsCommand::Show { task_id, team } => {
            let task_id = parse_task_id("task_id", Some(&task_id))?;
            let view = queries.get_dependencies(task_id, &TenantContext::new(team)).await?;
            output(&ShowOutput { task_id, view }, json_mode);
        }
        DepsCommand::Add {
            blocker_id,
            blocked_id,
            team,
        } => {
            let request = CreateDependencyRequest::new(&blocker_id, &blocked_id);
            let edge = mutations.create_dependency(request, &TenantContext::new(team)).await?;
            output(
                &EdgeOutput {
                    action: EdgeAction::Created,
                    blocker_id: edge.blocker_id.to_string(),
                    blocked_id: edge.blocked_id.to_string(),
                    edge: Some(edge),
                },
                json_mode,
            );
        }
        DepsCommand::Remove {
            blocker_id,
            blocked_id,
            team,
        } => {
            let request = DeleteDependencyRequest::new(&blocker_id, &blocked_id);
            mutations.delete_dependency(request, &TenantContext::new(team)).await?;
            output(
                &EdgeOutput {
                    action: EdgeAction::Removed,
                    blocker_id,
                    blocked_id,
                    edge: None,
                },
                json_mode,
            );
        }
    }

    Ok(())
}
