//! case-harvester main entry point
//!
//! This is the command-line interface for the case harvester.

use anyhow::Context;
use case_harvester::checkpoint::CheckpointManager;
use case_harvester::config::{load_config_with_hash, Config};
use case_harvester::extractor::run_harvest;
use case_harvester::output::{load_statistics, print_run_result, print_statistics};
use case_harvester::storage::open_store;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// case-harvester: resumable extraction of case synopses and teaching points
///
/// Reads curriculum rows from the database, scrapes each case's synopsis and
/// named teaching point from the course repositories, and writes the cleaned
/// text back. Interrupted runs resume from the last checkpoint.
#[derive(Parser, Debug)]
#[command(name = "case-harvester")]
#[command(version)]
#[command(about = "Resumable extraction of case synopses and teaching points", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Delete the checkpoint and start from scratch
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    fresh: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and checkpoint, then exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config).await?;
    } else {
        handle_harvest(&config, &config_hash, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("case_harvester=info,warn"),
            1 => EnvFilter::new("case_harvester=debug,info"),
            2 => EnvFilter::new("case_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== case-harvester Dry Run ===\n");

    println!("Extraction:");
    println!(
        "  Max concurrent jobs: {}",
        config.extraction.max_concurrent_jobs
    );
    println!(
        "  Checkpoint interval: {} items",
        config.extraction.checkpoint_interval
    );
    println!(
        "  Retry attempts: {} ({}ms apart)",
        config.extraction.retry_attempts, config.extraction.retry_delay_ms
    );
    println!(
        "  Visibility timeout: {}ms",
        config.extraction.visibility_timeout_ms
    );
    println!(
        "  Navigation timeout: {}ms",
        config.extraction.navigation_timeout_ms
    );

    println!("\nSession:");
    println!("  User agent: {}", config.session.user_agent);
    match &config.session.cookie_env {
        Some(name) => println!(
            "  Cookie variable: {} ({})",
            name,
            if std::env::var_os(name).is_some() {
                "set"
            } else {
                "not set"
            }
        ),
        None => println!("  Cookie variable: none"),
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    let catalog = config.catalog();
    println!("\nCourses ({}):", catalog.len());
    for entry in catalog.entries() {
        println!("  - {}: {}", entry.name, entry.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database and checkpoint
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}", config.output.database_path);
    println!("Checkpoint: {}\n", config.output.checkpoint_path);

    let store = open_store(Path::new(&config.output.database_path))
        .context("failed to open the database")?;
    let checkpoints = CheckpointManager::new(&config.output.checkpoint_path);

    let stats = load_statistics(&store, &checkpoints).await?;
    print_statistics(&stats);

    Ok(())
}

/// Reads the session cookie from the configured environment variable
fn session_cookie(config: &Config) -> anyhow::Result<Option<String>> {
    let Some(name) = &config.session.cookie_env else {
        return Ok(None);
    };

    let cookie = std::env::var(name)
        .with_context(|| format!("session cookie variable {} is not set", name))?;
    Ok(Some(cookie))
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring previous checkpoint)");
    } else {
        tracing::info!("Starting harvest (will resume from checkpoint if present)");
    }
    tracing::info!("Courses in catalog: {}", config.courses.len());

    let cookie = session_cookie(config)?;

    let result = run_harvest(config, config_hash, cookie.as_deref(), fresh)
        .await
        .context("harvest failed")?;

    print_run_result(&result);
    Ok(())
}
