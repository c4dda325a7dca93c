//! Cache administration CLI.
//!
//! Reports on and repairs the on-disk slice cache shared by loaders.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use climate_common::Resolution;
use serde::Serialize;
use slice_cache::CacheConfig;
use tracing_subscriber::{fmt, EnvFilter};

use cache_admin::{describe_key, disk_stats, inspect_blob, open_disk, verify_disk};

#[derive(Parser, Debug)]
#[command(name = "cache-admin")]
#[command(about = "Inspect and maintain the climate slice disk cache")]
struct Cli {
    /// Cache directory (blobs live under data_cache/)
    #[arg(long, env = "NEX_GDDP_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the cache key and blob path for a slice
    Key {
        #[arg(short, long)]
        variable: String,

        #[arg(short, long)]
        model: String,

        /// Date as YYYY-MM-DD
        #[arg(short, long)]
        date: String,

        /// Inferred from the date when omitted
        #[arg(short, long)]
        scenario: Option<String>,

        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        resolution: Resolution,
    },

    /// Print the header and NaN statistics of a blob
    Inspect {
        path: PathBuf,
    },

    /// Load every blob, removing corrupt ones and leftover temp files
    Verify {
        /// Report only, delete nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Count blobs and their total size
    Stats,

    /// Print the dataset catalogue
    Metadata,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let mut config = CacheConfig::from_env();
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }

    match cli.command {
        Commands::Key {
            variable,
            model,
            date,
            scenario,
            resolution,
        } => {
            let disk = open_disk(&config).context("failed to open disk cache")?;
            let report =
                describe_key(&disk, &variable, &model, &date, scenario.as_deref(), resolution)?;
            print_json(&report)
        }
        Commands::Inspect { path } => {
            let report =
                inspect_blob(&path).with_context(|| format!("failed to inspect {}", path.display()))?;
            print_json(&report)
        }
        Commands::Verify { dry_run } => {
            let disk = open_disk(&config).context("failed to open disk cache")?;
            let report = verify_disk(&disk, dry_run).context("verification failed")?;
            print_json(&report)
        }
        Commands::Stats => {
            let disk = open_disk(&config).context("failed to open disk cache")?;
            let report = disk_stats(&disk).context("failed to scan disk cache")?;
            print_json(&report)
        }
        Commands::Metadata => print_json(&climate_common::available_metadata()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
