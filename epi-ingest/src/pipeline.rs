//! One ingestion run
//!
//! Fetch every source (all or nothing), normalize and assemble the two
//! datasets, then replace each live table. The datasets succeed or fail
//! independently; a fetch failure aborts before anything is written.

use crate::assembler::{assemble, write_debug_output};
use crate::db::{replace_table, ReplaceReport};
use crate::error::DatasetError;
use crate::guard::RegressionGuard;
use crate::models::DatasetKind;
use crate::services::{FetchError, SourceFetcher};
use crate::sources::SourceSpec;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::{error, info};

/// Knobs for a run beyond the source list
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub guard: RegressionGuard,
    pub debug_output_dir: Option<PathBuf>,
}

/// Per-dataset outcome of a run
#[derive(Debug)]
pub struct RunReport {
    pub cases: Result<ReplaceReport, DatasetError>,
    pub interventions: Result<ReplaceReport, DatasetError>,
}

impl RunReport {
    /// Both live tables were replaced
    pub fn succeeded(&self) -> bool {
        self.cases.is_ok() && self.interventions.is_ok()
    }

    fn log_outcome(dataset: DatasetKind, outcome: &Result<ReplaceReport, DatasetError>) {
        match outcome {
            Ok(report) => info!(
                dataset = %dataset,
                rows = report.rows_loaded,
                previous = report.live_rows_before,
                "Dataset loaded"
            ),
            Err(e) => error!(dataset = %dataset, "Dataset failed: {}", e),
        }
    }
}

/// Run the full fetch → normalize → replace sequence
pub async fn run(
    pool: &SqlitePool,
    fetcher: &SourceFetcher,
    sources: &[SourceSpec],
    options: &PipelineOptions,
) -> Result<RunReport, FetchError> {
    info!(sources = sources.len(), "Fetching sources");
    let payloads = fetcher.fetch_all(sources).await?;

    let datasets = assemble(
        sources
            .iter()
            .zip(payloads.iter().map(String::as_str)),
    );

    if let Some(dir) = &options.debug_output_dir {
        write_debug_output(dir, &datasets).await;
    }

    // SQLite has one writer; the replaces run back to back
    let cases = replace_table(pool, &datasets.cases, &options.guard).await;
    RunReport::log_outcome(DatasetKind::Cases, &cases);

    let interventions = replace_table(pool, &datasets.interventions, &options.guard).await;
    RunReport::log_outcome(DatasetKind::Interventions, &interventions);

    Ok(RunReport {
        cases,
        interventions,
    })
}
