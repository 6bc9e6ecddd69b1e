//! epi-ingest - COVID-19 case and intervention loader
//!
//! Exits 0 when both live tables were replaced, 1 otherwise.

use anyhow::{Context, Result};
use clap::Parser;
use epi_common::config::TomlConfig;
use epi_common::db::init_database;
use epi_ingest::config::{CliOverrides, IngestConfig};
use epi_ingest::services::SourceFetcher;
use epi_ingest::{run, PipelineOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "epi-ingest")]
#[command(about = "Load COVID-19 case and intervention data into SQLite")]
#[command(version)]
struct Args {
    /// Directory for cached source payloads (reused when present)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Replace live tables even when row counts drop sharply
    #[arg(long)]
    force: bool,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Config file (default: platform config directory)
    #[arg(long, env = "EPI_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for case-data.json and intervention-data.json
    #[arg(long)]
    debug_output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let (toml_config, origin) = TomlConfig::load(args.config.as_deref())
        .context("Failed to load configuration file")?;

    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting epi-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    origin.log();

    let config = IngestConfig::resolve(
        &toml_config,
        CliOverrides {
            database: args.database,
            cache_dir: args.cache_dir,
            debug_output: args.debug_output,
            force: args.force,
        },
    );
    config.log();

    let pool = init_database(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;

    let fetcher = SourceFetcher::new(config.cache_dir.clone())
        .context("Failed to build HTTP client")?;
    let options = PipelineOptions {
        guard: config.guard,
        debug_output_dir: config.debug_output_dir.clone(),
    };

    let outcome = run(&pool, &fetcher, &config.sources, &options).await;
    pool.close().await;

    match outcome {
        Ok(report) if report.succeeded() => {
            info!("Ingestion complete");
            Ok(ExitCode::SUCCESS)
        }
        Ok(_) => {
            error!("Ingestion finished with failures; see errors above");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            error!("Fetch failed, nothing written: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
