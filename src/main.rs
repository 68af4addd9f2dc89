//! Site-Downloader main entry point
//!
//! This is the command-line interface for the Site-Downloader offline mirror builder.

use clap::Parser;
use site_downloader::config::{self, load_config_with_hash, Config};
use site_downloader::crawler::{load_seed_file, run_download};
use site_downloader::output::print_summary;
use site_downloader::plugin::default_registry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Downloader: saves pages and their assets for offline browsing
///
/// Each URL in the URL file is handed to the plugin best suited to it. Pages,
/// images and stylesheets are saved under the root directory with references
/// rewritten to point at the local copies.
#[derive(Parser, Debug)]
#[command(name = "site-downloader")]
#[command(version = "1.0.0")]
#[command(about = "Downloads sites for offline browsing", long_about = None)]
struct Cli {
    /// Directory that receives all downloaded files
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// File with one URL per line
    #[arg(value_name = "URL_FILE")]
    url_file: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run one download at a time, in queue order
    #[arg(long)]
    single_thread: bool,

    /// Maximum number of concurrent downloads
    #[arg(long, value_name = "N", conflicts_with = "single_thread")]
    max_workers: Option<usize>,

    /// Validate settings and show the seed list without downloading
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };

    // Command-line flags win over the settings file
    if cli.single_thread {
        config.downloader.single_thread = true;
    }
    if let Some(max_workers) = cli.max_workers {
        config.downloader.max_workers = max_workers;
    }

    if cli.dry_run {
        handle_dry_run(&cli, &config)?;
    } else {
        handle_download(&cli, &config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_downloader=info,warn"),
            1 => EnvFilter::new("site_downloader=debug,info"),
            2 => EnvFilter::new("site_downloader=trace,debug"),
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

/// Handles the --dry-run mode: validates settings and lists the seeds
fn handle_dry_run(cli: &Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    config::validate(config)?;
    let registry = default_registry(config)?;
    let seeds: Vec<String> = load_seed_file(&cli.url_file)?
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect();

    println!("=== Site-Downloader Dry Run ===\n");

    println!("Downloader Configuration:");
    println!("  Root: {}", cli.root.display());
    if config.downloader.single_thread {
        println!("  Mode: single thread");
    } else {
        println!("  Mode: up to {} workers", config.downloader.max_workers);
    }
    println!("  User agent: {}", config.downloader.user_agent);
    println!(
        "  Timeouts: connect {}s, read {}s, {} connect attempts",
        config.timeouts.connect_secs, config.timeouts.read_secs, config.timeouts.connect_attempts
    );

    println!("\nPlugins ({}):", registry.len());
    for name in registry.names() {
        println!("  - {}", name);
    }

    println!("\nSeed URLs ({}):", seeds.len());
    for seed in &seeds {
        match registry.select(seed) {
            Some(plugin) => println!("  - {} ({})", seed, plugin.name()),
            None => println!("  - {} (no plugin)", seed),
        }
    }

    if !cli.root.is_dir() {
        println!("\n✗ Root directory does not exist: {}", cli.root.display());
    } else {
        println!("\n✓ Configuration is valid");
    }

    Ok(())
}

/// Handles the main download operation
async fn handle_download(cli: &Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry = default_registry(config)?;

    match run_download(config, &cli.root, &cli.url_file, registry).await {
        Ok(summary) => {
            tracing::info!("Download completed");
            if !cli.quiet {
                print_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Download failed: {}", e);
            Err(e.into())
        }
    }
}
