//! Instrumentor CLI
//!
//! Explains agent enablement and sampling decisions, either by evaluating a
//! cluster state snapshot locally or by querying a running instrumentor.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{distros, local, remote};
use std::path::PathBuf;

/// Instrumentor CLI
#[derive(Parser)]
#[command(name = "instrctl")]
#[command(author, version, about = "Describe OpenTelemetry agent enablement decisions", long_about = None)]
pub struct Cli {
    /// Instrumentor API URL (can also be set via INSTRUMENTOR_API_URL env var)
    #[arg(long, env = "INSTRUMENTOR_API_URL")]
    pub api_url: Option<String>,

    /// Distro catalog YAML for local evaluation (built-in catalog if unset)
    #[arg(long, env = "INSTRUMENTOR_CATALOG_PATH")]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a snapshot file and describe per-container decisions
    Describe {
        /// Cluster state snapshot (JSON or YAML)
        #[arg(long, short)]
        snapshot: PathBuf,

        /// Workload as namespace/kind/name; all workloads if omitted
        workload: Option<String>,
    },

    /// Show the head and tail sampling compiled for a workload
    Sampling {
        /// Cluster state snapshot (JSON or YAML)
        #[arg(long, short)]
        snapshot: PathBuf,

        /// Workload as namespace/kind/name
        workload: String,
    },

    /// List the distros of the catalog
    Distros,

    /// Query a running instrumentor service
    #[command(subcommand)]
    Remote(RemoteCommands),
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// List the latest evaluation of every workload
    List,

    /// Show the latest evaluation of one workload
    Get {
        /// Workload as namespace/kind/name
        workload: String,
    },

    /// Evaluate a local snapshot with the service's catalog
    Evaluate {
        /// Cluster state snapshot (JSON or YAML)
        #[arg(long, short)]
        snapshot: PathBuf,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let catalog = config.resolve_catalog_path(cli.catalog);
    let catalog = catalog.as_deref();

    match cli.command {
        Commands::Describe { snapshot, workload } => {
            local::describe(&snapshot, catalog, workload.as_deref(), cli.format).await?;
        }
        Commands::Sampling { snapshot, workload } => {
            local::sampling(&snapshot, catalog, &workload, cli.format).await?;
        }
        Commands::Distros => {
            distros::list(catalog, cli.format)?;
        }
        Commands::Remote(remote_cmd) => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url))?;
            match remote_cmd {
                RemoteCommands::List => remote::list(&client, cli.format).await?,
                RemoteCommands::Get { workload } => {
                    remote::get(&client, &workload, cli.format).await?
                }
                RemoteCommands::Evaluate { snapshot } => {
                    remote::evaluate(&client, &snapshot, cli.format).await?
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        output::print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}
