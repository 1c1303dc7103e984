//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::adapters::sqlite::{initialize_from_config, SqliteDependencyRepository};
use crate::domain::models::Config;
use crate::domain::ports::AuditSink;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{JsonlAuditSink, TracingAuditSink};
use crate::services::{DependencyQueryService, DependencyService};

/// Load configuration from `path`, or from `.taskdeps/` and the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Open the configured database and wire up both services.
pub async fn build_services(
    config: &Config,
) -> Result<(
    DependencyQueryService<SqliteDependencyRepository>,
    DependencyService<SqliteDependencyRepository>,
)> {
    let pool = initialize_from_config(&config.database)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    let repo = Arc::new(SqliteDependencyRepository::new(pool));
    let audit = audit_sink(config).await?;

    let queries = DependencyQueryService::new(Arc::clone(&repo)).with_tenancy(config.tenancy.enabled);
    let mutations = DependencyService::new(repo)
        .with_audit_sink(audit)
        .with_tenancy(config.tenancy.enabled);
    Ok((queries, mutations))
}

async fn audit_sink(config: &Config) -> Result<Arc<dyn AuditSink>> {
    match config.audit.log_path {
        Some(ref path) => Ok(Arc::new(JsonlAuditSink::new(path).await?)),
        None => Ok(Arc::new(TracingAuditSink)),
    }
}

/// Print `err` (as JSON with `--json`) and exit with status 1.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  Caused by: {cause}");
        }
    }
    std::process::exit(1);
}
