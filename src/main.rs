//! AgentRisk - risk and compliance scoring for agentic AI systems
//!
//! Scores source files against a catalog of agentic-AI risks and six
//! compliance frameworks, with an optional LLM classifier.

use agentrisk::analyzer::ScoringProfile;
use agentrisk::catalog::CatalogVersion;
use agentrisk::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;

/// AgentRisk - Agentic AI Risk & Compliance Scanner
#[derive(Parser)]
#[command(name = "agentrisk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ~/.agentrisk/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Scoring profile: standard or enterprise
    #[arg(long, global = true)]
    profile: Option<ScoringProfile>,

    /// Catalog version: core or extended
    #[arg(long, global = true)]
    catalog_version: Option<CatalogVersion>,

    /// Replace the built-in catalog with a YAML file
    #[arg(long, global = true)]
    catalog_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze files or directories
    Analyze {
        /// Files or directories to analyze
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Glob filter for files found in directories (repeatable)
        #[arg(short, long)]
        include: Vec<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Never call the classifier
        #[arg(long)]
        offline: bool,

        /// Concurrent analysis workers
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Local pattern and security scan of one file
    Scan {
        file: PathBuf,

        /// Print the file analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect the risk catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Start the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        listen: Option<String>,

        /// Never call the classifier
        #[arg(long)]
        offline: bool,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List all risks
    List,
    /// Show risk details
    Show { id: String },
    /// List compliance frameworks
    Frameworks,
    /// Export the active catalog as YAML
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(profile) = cli.profile {
        config.analysis.profile = profile;
    }
    if let Some(catalog_version) = cli.catalog_version {
        config.analysis.catalog_version = catalog_version;
    }
    if let Some(catalog_file) = cli.catalog_file {
        config.analysis.catalog_file = Some(catalog_file);
    }

    match cli.command {
        Commands::Analyze {
            paths,
            include,
            json,
            output,
            offline,
            jobs,
        } => {
            info!("🛡️ Starting analysis...");
            cli::analyze::run(
                config,
                cli::analyze::AnalyzeOptions {
                    paths,
                    include,
                    json,
                    output,
                    offline,
                    jobs,
                },
            )
            .await?;
        }
        Commands::Scan { file, json } => {
            cli::scan::run(&config, &file, json).await?;
        }
        Commands::Catalog { action } => match action {
            CatalogAction::List => cli::catalog::list(&config).await?,
            CatalogAction::Show { id } => cli::catalog::show(&config, &id).await?,
            CatalogAction::Frameworks => cli::catalog::frameworks(&config).await?,
            CatalogAction::Export { output } => {
                cli::catalog::export(&config, output.as_deref()).await?
            }
        },
        Commands::Serve { listen, offline } => {
            info!("🛡️ Starting AgentRisk API...");
            cli::serve::run(config, listen, offline).await?;
        }
    }

    Ok(())
}
