//! Database initialization
//!
//! Opens (creating on first run) the SQLite database and makes sure both
//! live tables exist so the first load has something to compare against.

use super::schema::create_live_table;
use super::table_schemas::{CasesTableSchema, InterventionsTableSchema};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Lock wait applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create live tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL keeps readers of the live tables unblocked while a replace runs
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_live_tables(&pool).await?;

    Ok(pool)
}

/// Create the `cases` and `interventions` tables (idempotent)
pub async fn create_live_tables(pool: &SqlitePool) -> Result<()> {
    create_live_table::<CasesTableSchema>(pool).await?;
    create_live_table::<InterventionsTableSchema>(pool).await?;
    Ok(())
}
