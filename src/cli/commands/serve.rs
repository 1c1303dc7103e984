//! Implementation of the `taskdeps serve` command.

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use crate::adapters::http::{DependencyHttpConfig, DependencyHttpServer};
use crate::cli::build_services;
use crate::domain::models::Config;

/// Arguments for `taskdeps serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host to bind to (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(long, short)]
    pub port: Option<u16>,
}

/// Serve the HTTP API until Ctrl-C.
pub async fn execute(args: ServeArgs, config: &Config) -> Result<()> {
    let mut http_config = DependencyHttpConfig::from(&config.server);
    if let Some(host) = args.host {
        http_config.host = host;
    }
    if let Some(port) = args.port {
        http_config.port = port;
    }

    let (queries, mutations) = build_services(config).await?;
    info!(
        database = %config.database.path,
        tenancy = config.tenancy.enabled,
        "starting dependency service"
    );

    DependencyHttpServer::new(queries, mutations, http_config)
        .serve_with_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server failed: {e}"))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
    }
}
