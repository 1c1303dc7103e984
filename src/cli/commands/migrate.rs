//! Implementation of the `taskdeps migrate` command.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::sqlite::{all_embedded_migrations, create_pool, Migrator, PoolConfig};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

/// Result of `taskdeps migrate`.
#[derive(Debug, Serialize)]
pub struct MigrateOutput {
    pub database: String,
    pub applied: usize,
    pub schema_version: i64,
}

impl CommandOutput for MigrateOutput {
    fn to_human(&self) -> String {
        if self.applied == 0 {
            format!("{} is up to date (schema version {})", self.database, self.schema_version)
        } else {
            format!(
                "Applied {} migration(s) to {} (schema version {})",
                self.applied, self.database, self.schema_version
            )
        }
    }
}

/// Open the configured database and apply pending migrations.
pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let pool = create_pool(&config.database.url(), Some(PoolConfig::from(&config.database)))
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;

    let migrator = Migrator::new(pool.clone());
    let applied = migrator
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("Failed to run migrations")?;
    let schema_version = migrator.get_current_version().await?;
    pool.close().await;

    output(
        &MigrateOutput {
            database: config.database.path.clone(),
            applied,
            schema_version,
        },
        json_mode,
    );
    Ok(())
}
