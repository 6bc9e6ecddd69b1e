//! Shadow-table replace
//!
//! A live table is never modified in place. A replace builds `<table>_new`
//! from the declared schema, bulk-loads it, checks its row count against the
//! live table and then swaps the two by renaming, all in one transaction.
//! Readers see either the old contents or the new ones.
//!
//! ```text
//! Idle -> ShadowCreated -> Loaded -> Validated -> Swapped
//!   \__________\_____________\__________\______-> Aborted (rollback)
//! ```
//!
//! `<table>_old` and `<table>_new` are dropped before every load, in case a
//! previous run crashed, and again after it whatever the outcome.

use super::records::TableRecord;
use crate::error::DatasetError;
use crate::guard::RegressionGuard;
use crate::utils::{begin_monitored, MonitoredTransaction};
use epi_common::db::{SchemaIntrospector, TableSchema};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::fmt;
use tracing::{debug, info, warn};

/// SQLite's historical default for host parameters per statement
const MAX_BIND_VARIABLES: usize = 999;

/// Progress of one replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceState {
    Idle,
    ShadowCreated,
    Loaded,
    Validated,
    Swapped,
    Aborted,
}

impl fmt::Display for ReplaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplaceState::Idle => "idle",
            ReplaceState::ShadowCreated => "shadow created",
            ReplaceState::Loaded => "loaded",
            ReplaceState::Validated => "validated",
            ReplaceState::Swapped => "swapped",
            ReplaceState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceReport {
    pub live_rows_before: i64,
    pub rows_loaded: i64,
}

/// Scoped ownership of a table's `_new` and `_old` companions
///
/// Must be finished with [`ShadowTables::release`]; dropping it without
/// releasing leaves the companions for the next run to clean up and logs a
/// warning.
pub struct ShadowTables {
    table: &'static str,
    shadow: String,
    old: String,
    released: bool,
}

impl ShadowTables {
    /// Clear leftovers from an earlier run and claim the companion names
    pub async fn prepare(pool: &SqlitePool, table: &'static str) -> epi_common::Result<Self> {
        let shadow = format!("{}_new", table);
        let old = format!("{}_old", table);
        drop_companions(pool, &shadow, &old).await?;

        Ok(Self {
            table,
            shadow,
            old,
            released: false,
        })
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn shadow_name(&self) -> &str {
        &self.shadow
    }

    pub fn old_name(&self) -> &str {
        &self.old
    }

    /// Drop both companions; runs outside any transaction
    pub async fn release(mut self, pool: &SqlitePool) -> epi_common::Result<()> {
        self.released = true;
        drop_companions(pool, &self.shadow, &self.old).await
    }
}

impl Drop for ShadowTables {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                table = self.table,
                "Shadow tables not released; they will be dropped on the next run"
            );
        }
    }
}

async fn drop_companions(pool: &SqlitePool, shadow: &str, old: &str) -> epi_common::Result<()> {
    for name in [old, shadow] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", name))
            .execute(pool)
            .await?;
    }
    Ok(())
}

fn replace_error<E>(table: &'static str, state: ReplaceState) -> impl FnOnce(E) -> DatasetError
where
    E: Into<epi_common::Error>,
{
    move |source| DatasetError::Replace {
        table,
        state,
        source: source.into(),
    }
}

/// Atomically replace the live table for `R` with `records`
///
/// An empty `records` is refused before the database is touched. On any
/// failure the live table keeps its previous contents.
pub async fn replace_table<R: TableRecord>(
    pool: &SqlitePool,
    records: &[R],
    guard: &RegressionGuard,
) -> Result<ReplaceReport, DatasetError> {
    let table = R::Schema::table_name();
    if records.is_empty() {
        return Err(DatasetError::EmptyDataset { table });
    }

    let shadow = ShadowTables::prepare(pool, table)
        .await
        .map_err(replace_error(table, ReplaceState::Idle))?;

    let outcome = load_and_swap(pool, &shadow, records, guard).await;

    if let Err(e) = shadow.release(pool).await {
        warn!(table, error = %e, "Failed to drop shadow tables");
    }

    match &outcome {
        Ok(report) => info!(
            table,
            state = %ReplaceState::Swapped,
            previous = report.live_rows_before,
            loaded = report.rows_loaded,
            "Replaced live table"
        ),
        Err(e) => debug!(table, state = %ReplaceState::Aborted, error = %e, "Replace aborted"),
    }

    outcome
}

async fn load_and_swap<R: TableRecord>(
    pool: &SqlitePool,
    shadow: &ShadowTables,
    records: &[R],
    guard: &RegressionGuard,
) -> Result<ReplaceReport, DatasetError> {
    let mut tx = begin_monitored(pool, "replace_table")
        .await
        .map_err(replace_error(shadow.table(), ReplaceState::Idle))?;

    match populate_and_swap(&mut tx, shadow, records, guard).await {
        Ok(report) => {
            tx.commit()
                .await
                .map_err(replace_error(shadow.table(), ReplaceState::Validated))?;
            Ok(report)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(table = shadow.table(), error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn populate_and_swap<R: TableRecord>(
    tx: &mut MonitoredTransaction<'_>,
    shadow: &ShadowTables,
    records: &[R],
    guard: &RegressionGuard,
) -> Result<ReplaceReport, DatasetError> {
    let table = shadow.table();

    sqlx::query(&R::Schema::create_table_sql(shadow.shadow_name(), false))
        .execute(tx.conn())
        .await
        .map_err(replace_error(table, ReplaceState::Idle))?;
    debug!(table, shadow = shadow.shadow_name(), "Shadow table created");

    let columns = R::Schema::expected_columns().len().max(1);
    let rows_per_statement = (MAX_BIND_VARIABLES / columns).max(1);
    let insert_prefix = format!(
        "INSERT INTO {} ({}) ",
        shadow.shadow_name(),
        R::Schema::column_list()
    );

    for chunk in records.chunks(rows_per_statement) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(&insert_prefix);
        builder.push_values(chunk, |row, record| record.push_row(row));
        builder
            .build()
            .execute(tx.conn())
            .await
            .map_err(replace_error(table, ReplaceState::ShadowCreated))?;
    }

    let live = SchemaIntrospector::row_count(tx.conn(), table)
        .await
        .map_err(replace_error(table, ReplaceState::Loaded))?;
    let candidate = SchemaIntrospector::row_count(tx.conn(), shadow.shadow_name())
        .await
        .map_err(replace_error(table, ReplaceState::Loaded))?;
    debug!(table, live, candidate, "Shadow table loaded");

    guard
        .validate(live, candidate)
        .map_err(|source| DatasetError::Regression { table, source })?;

    for (from, to) in [(table, shadow.old_name()), (shadow.shadow_name(), table)] {
        sqlx::query(&format!("ALTER TABLE {} RENAME TO {}", from, to))
            .execute(tx.conn())
            .await
            .map_err(replace_error(table, ReplaceState::Validated))?;
    }

    Ok(ReplaceReport {
        live_rows_before: live,
        rows_loaded: candidate,
    })
}
