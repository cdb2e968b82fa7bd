mod commands;
mod target;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crossrep")]
#[command(about = "Cross-region volume replication: provision, mirror, clean up", long_about = None)]
struct Cli {
    /// Configuration file (default: discovered appsettings.json)
    #[arg(short, long, global = true, env = "CROSSREP_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Run against an in-memory control plane instead of Azure
    #[arg(long, global = true)]
    simulate: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the topology and establish replication
    Up {
        /// Clean up afterwards even when shouldCleanUp is false
        #[arg(long)]
        cleanup: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove replication and delete every configured resource
    Down {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the configuration and print the topology
    Validate,
    /// Show the remote state of every configured resource
    Status,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if matches!(cli.command, Commands::Version) {
        println!("crossrep {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if matches!(cli.command, Commands::Validate) {
        return commands::validate::handle(cli.config.as_deref());
    }

    let context = commands::Context::load(cli.config.as_deref(), cli.simulate)?;
    match cli.command {
        Commands::Up { cleanup, json } => commands::up::handle(&context, cleanup, json).await,
        Commands::Down { json } => commands::down::handle(&context, json).await,
        Commands::Status => commands::status::handle(&context).await,
        Commands::Validate | Commands::Version => Ok(()),
    }
}
