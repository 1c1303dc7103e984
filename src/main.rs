//! taskdeps CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taskdeps::cli::{self, commands, Cli, Commands};
use taskdeps::domain::models::Config;
use taskdeps::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => {
            let _logger = init_server_logging(&config)?;
            commands::serve::execute(args, &config).await
        }
        Commands::Migrate => {
            init_cli_logging();
            commands::migrate::execute(&config, cli.json).await
        }
        Commands::Deps(args) => {
            init_cli_logging();
            commands::deps::execute(args, &config, cli.json).await
        }
    }
}

fn init_server_logging(config: &Config) -> Result<LoggerImpl> {
    let log_config = LogConfig::try_from(&config.logging).map_err(anyhow::Error::msg)?;
    LoggerImpl::init(&log_config)
}

/// One-shot commands print results on stdout, so logs go to stderr.
fn init_cli_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
