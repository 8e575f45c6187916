//! devops-sync entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration:** layer `devops-sync.toml` and `DEVOPS_SYNC__*`
//!    environment variables, then validate the workflow options.
//! 2. **Wire observability:** configure `tracing-subscriber` and, when an
//!    endpoint is configured, an OpenTelemetry OTLP exporter. All `tracing`
//!    spans and structured events emitted by every crate in the workspace flow
//!    through this layer.
//! 3. **Construct infrastructure:** create the [`AzureDevOpsConnector`], the
//!    shared [`ConnectionCache`], and the [`DevOpsProvider`] facade.
//! 4. **Run one command:** see [`Command`]. Results are written to stdout as
//!    JSON; logs go to stderr.
//!
//! Ctrl-C cancels the in-flight command through a [`CancellationToken`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use azure_devops::{AzureDevOpsConnector, DEFAULT_TIMEOUT};
use clap::{Parser, Subcommand};
use listener::{LoggingSink, SynchronizationProcessor};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use workflow::{ConnectionCache, DevOpsProvider, SystemClock, DEFAULT_CONNECTION_TTL};

mod settings;
mod telemetry;

use settings::{AppConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(
    name = "devops-sync",
    version,
    about = "Keeps Azure DevOps service hooks and repository discovery in sync"
)]
struct Cli {
    /// Configuration file. Missing files are ignored.
    #[arg(
        long,
        global = true,
        env = "DEVOPS_SYNC_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or update the service hook subscriptions and print their ids.
    Subscriptions,
    /// List the project's repositories.
    Repositories,
    /// Print the first configuration file found in a repository.
    ConfigFile {
        /// Repository id or name.
        repository: String,
    },
    /// Run one synchronisation trigger and print the report.
    Process {
        /// Trigger message, e.g. `{"trigger":true,"repositoryProviderId":"..."}`.
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config).with_context(|| {
        format!("Failed to load configuration from {}", cli.config.display())
    })?;
    telemetry::init(&config.telemetry)?;

    let result = run(cli.command, config).await;
    if let Err(error) = &result {
        warn!(error = %error, "Command failed");
    }
    telemetry::shutdown();
    result
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    let settings = config
        .workflow
        .validate()
        .context("Invalid workflow configuration")?;

    let connector = Arc::new(
        AzureDevOpsConnector::new(DEFAULT_TIMEOUT).context("Failed to build HTTP client")?,
    );
    let connections = Arc::new(ConnectionCache::new(
        connector,
        Arc::new(SystemClock),
        DEFAULT_CONNECTION_TTL,
    ));
    let provider = Arc::new(DevOpsProvider::new(settings, connections));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    match command {
        Command::Subscriptions => {
            let ids = provider.create_or_update_subscriptions(&cancel).await?;
            print_json(&ids)
        }
        Command::Repositories => {
            let repositories = provider.get_repositories(&cancel).await?;
            print_json(&repositories)
        }
        Command::ConfigFile { repository } => {
            let item = provider
                .get_configuration_file(&repository, &cancel)
                .await?;
            print_json(&item)
        }
        Command::Process { message } => {
            let processor = SynchronizationProcessor::new(provider, Arc::new(LoggingSink));
            let report = processor.process_json(message.as_bytes(), &cancel).await?;
            print_json(&report)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_file_subcommand_takes_repository() {
        let cli = Cli::try_parse_from(["devops-sync", "config-file", "web"]).unwrap();
        assert!(matches!(cli.command, Command::ConfigFile { repository } if repository == "web"));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }
}
