//! Tests for database initialization
//!
//! Covers automatic database creation and idempotent creation of the live
//! `cases` and `interventions` tables.

use epi_common::db::init::init_database;
use epi_common::db::schema::{SchemaIntrospector, TableSchema};
use epi_common::db::table_schemas::{CasesTableSchema, InterventionsTableSchema};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("epi.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_live_tables_created() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("epi.db")).await.unwrap();

    assert!(SchemaIntrospector::table_exists(&pool, "cases").await.unwrap());
    assert!(SchemaIntrospector::table_exists(&pool, "interventions").await.unwrap());

    let columns = SchemaIntrospector::column_names(&pool, "cases").await.unwrap();
    assert_eq!(
        columns,
        vec!["region_id", "subregion_id", "date", "confirmed", "recovered", "deaths"]
    );

    let columns = SchemaIntrospector::column_names(&pool, InterventionsTableSchema::table_name())
        .await
        .unwrap();
    assert_eq!(columns.len(), 10);
    assert_eq!(columns[6], "start_date");
}

#[tokio::test]
async fn test_database_opens_existing_and_keeps_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("epi.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO cases (region_id, subregion_id, date, confirmed, recovered, deaths) \
         VALUES ('GB', NULL, '2020-03-01', 10, 0, 1)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    // Second open must not recreate or truncate the live table
    let pool = init_database(&db_path).await.unwrap();
    let count = SchemaIntrospector::row_count(&pool, CasesTableSchema::table_name())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_negative_counts_rejected_by_schema() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("epi.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO cases (region_id, subregion_id, date, confirmed, recovered, deaths) \
         VALUES ('GB', NULL, '2020-03-01', -1, 0, 0)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "CHECK constraint should reject negative counts");
}
