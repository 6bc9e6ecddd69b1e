//! Declarative table schemas
//!
//! Schema definitions in code are the single source of truth for both the
//! live tables and the shadow tables built during a replace: the same column
//! list renders `CREATE TABLE` for any table name.
//!
//! ```rust,ignore
//! pub struct CasesTableSchema;
//!
//! impl TableSchema for CasesTableSchema {
//!     fn table_name() -> &'static str { "cases" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("region_id", "TEXT").not_null(),
//!             ColumnDefinition::new("confirmed", "INTEGER").not_null().check("confirmed >= 0"),
//!         ]
//!     }
//! }
//! ```

use crate::Result;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL")
    pub sql_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// CHECK constraint expression
    pub check: Option<String>,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            check: None,
        }
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Attach a CHECK constraint
    pub fn check(mut self, expression: impl Into<String>) -> Self {
        self.check = Some(expression.into());
        self
    }

    fn render(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(expr) = &self.check {
            sql.push_str(&format!(" CHECK ({})", expr));
        }
        sql
    }
}

/// Defines the schema of a replaceable table
pub trait TableSchema {
    /// Live table name in the database
    fn table_name() -> &'static str;

    /// Column definitions in insert order
    fn expected_columns() -> Vec<ColumnDefinition>;

    /// Comma-separated column list in declaration order
    fn column_list() -> String {
        Self::expected_columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `CREATE TABLE` statement for this schema under an arbitrary name
    fn create_table_sql(table: &str, if_not_exists: bool) -> String {
        let columns = Self::expected_columns()
            .iter()
            .map(ColumnDefinition::render)
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!(
            "CREATE TABLE {}{} (\n    {}\n)",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            table,
            columns
        )
    }
}

/// Create the live table for a schema if it does not exist
pub async fn create_live_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&T::create_table_sql(T::table_name(), true))
        .execute(pool)
        .await?;
    Ok(())
}

/// Schema introspection helpers
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Check if table exists
    pub async fn table_exists<'e, E>(executor: E, table_name: &str) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type='table' AND name = ?
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    /// Column names of a table in database order
    pub async fn column_names(pool: &SqlitePool, table_name: &str) -> Result<Vec<String>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;
        Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
    }

    /// Number of rows in a table
    pub async fn row_count<'e, E>(executor: E, table_name: &str) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table_name))
            .fetch_one(executor)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SampleSchema;

    impl TableSchema for SampleSchema {
        fn table_name() -> &'static str {
            "sample"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("id", "TEXT").not_null(),
                ColumnDefinition::new("n", "INTEGER").check("n >= 0"),
            ]
        }
    }

    #[test]
    fn test_create_table_sql_renders_constraints() {
        let sql = SampleSchema::create_table_sql("sample_new", false);
        assert!(sql.starts_with("CREATE TABLE sample_new ("));
        assert!(sql.contains("id TEXT NOT NULL"));
        assert!(sql.contains("n INTEGER CHECK (n >= 0)"));
    }

    #[test]
    fn test_create_table_sql_if_not_exists() {
        let sql = SampleSchema::create_table_sql("sample", true);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS sample"));
    }

    #[test]
    fn test_column_list_in_declaration_order() {
        assert_eq!(SampleSchema::column_list(), "id, n");
    }
}
