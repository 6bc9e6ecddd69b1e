//! Database Test Utilities

use anyhow::Result;
use epi_common::db::{init_database, SchemaIntrospector};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a temporary database with both live tables
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let pool = init_database(&temp_dir.path().join("epi.db")).await?;
    Ok((temp_dir, pool))
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    SchemaIntrospector::row_count(pool, table).await.unwrap()
}

/// Names of any `_new`/`_old` companion tables still present
pub async fn leftover_companions(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' \
         AND (name LIKE '%\\_new' ESCAPE '\\' OR name LIKE '%\\_old' ESCAPE '\\') \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}
