mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rallyguard")]
#[command(
    about = "Find and purge OpenStack resources left behind by Rally runs",
    long_about = None
)]
struct Cli {
    /// Results directory shared with the metrics exporter
    #[arg(long, global = true, env = "RESULTS_DIR")]
    results_dir: Option<PathBuf>,

    /// clouds.yaml entry to use
    #[arg(long, global = true, env = "OS_CLOUD")]
    os_cloud: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the cloud for orphans and publish a reconciliation report
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete orphaned resources (lists only, unless --confirm is given)
    Purge {
        /// Actually issue delete requests
        #[arg(long)]
        confirm: bool,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the last published report
    Report {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// Show the last purge outcome instead
        #[arg(long)]
        purge: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("rallyguard {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut settings = rallyguard_config::load()?;
    if let Some(dir) = cli.results_dir {
        settings.results_dir = dir;
    }
    if let Some(cloud) = cli.os_cloud {
        settings.cloud = Some(cloud);
    }
    tracing::debug!(
        cloud = settings.cloud.as_deref().unwrap_or("<env>"),
        results_dir = %settings.results_dir.display(),
        call_timeout_secs = settings.call_timeout_secs,
        "Settings loaded"
    );

    match cli.command {
        Commands::Check { json } => {
            commands::check::handle(&settings, json).await?;
        }
        Commands::Purge { confirm, json } => {
            commands::purge::handle(&settings, confirm, json).await?;
        }
        Commands::Report { json, purge } => {
            commands::report::handle(&settings, json, purge).await?;
        }
        Commands::Version => {}
    }

    Ok(())
}
