//! Run configuration for the loader
//!
//! Merges command-line flags with the bootstrap TOML config. Paths follow
//! CLI → environment → TOML → default priority.

use crate::guard::RegressionGuard;
use crate::sources::{apply_overrides, default_sources, SourceSpec};
use epi_common::config::{resolve_database_path, resolve_optional_path, TomlConfig};
use std::path::PathBuf;
use tracing::info;

pub const ENV_DATABASE: &str = "EPI_DATABASE";
pub const ENV_CACHE_DIR: &str = "EPI_CACHE_DIR";
pub const ENV_DEBUG_OUTPUT: &str = "EPI_DEBUG_OUTPUT";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub debug_output: Option<PathBuf>,
    pub force: bool,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub database_path: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub debug_output_dir: Option<PathBuf>,
    pub guard: RegressionGuard,
    pub sources: Vec<SourceSpec>,
}

impl IngestConfig {
    pub fn resolve(toml: &TomlConfig, cli: CliOverrides) -> Self {
        let database_path = resolve_database_path(
            cli.database.as_deref(),
            ENV_DATABASE,
            toml.database_path.as_deref(),
        );
        let cache_dir =
            resolve_optional_path(cli.cache_dir.as_deref(), ENV_CACHE_DIR, toml.cache_dir.as_deref());
        let debug_output_dir = resolve_optional_path(
            cli.debug_output.as_deref(),
            ENV_DEBUG_OUTPUT,
            toml.debug_output_dir.as_deref(),
        );

        let mut sources = default_sources();
        apply_overrides(&mut sources, &toml.sources);

        Self {
            database_path,
            cache_dir,
            debug_output_dir,
            guard: RegressionGuard::new(toml.max_drop_fraction(), cli.force),
            sources,
        }
    }

    /// Log the effective settings
    pub fn log(&self) {
        info!("Database path: {}", self.database_path.display());
        match &self.cache_dir {
            Some(dir) => info!("Source cache: {}", dir.display()),
            None => info!("Source cache disabled"),
        }
        if let Some(dir) = &self.debug_output_dir {
            info!("Debug output: {}", dir.display());
        }
        info!(
            max_drop_fraction = self.guard.max_drop_fraction,
            force = self.guard.force,
            "Regression guard"
        );
    }
}
