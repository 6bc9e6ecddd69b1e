//! Binding canonical records into bulk inserts

use crate::models::{CaseRecord, InterventionRecord};
use epi_common::db::{CasesTableSchema, InterventionsTableSchema, TableSchema};
use sqlx::query_builder::Separated;
use sqlx::Sqlite;

/// A record that can be written as one row of its table
pub trait TableRecord {
    type Schema: TableSchema;

    /// Bind this record's values in the schema's column order
    fn push_row(&self, row: Separated<'_, '_, Sqlite, &'static str>);
}

impl TableRecord for CaseRecord {
    type Schema = CasesTableSchema;

    fn push_row(&self, mut row: Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.region_id.clone())
            .push_bind(self.subregion_id.clone())
            .push_bind(self.date)
            .push_bind(self.confirmed)
            .push_bind(self.recovered)
            .push_bind(self.deaths);
    }
}

impl TableRecord for InterventionRecord {
    type Schema = InterventionsTableSchema;

    fn push_row(&self, mut row: Separated<'_, '_, Sqlite, &'static str>) {
        row.push_bind(self.region_id.clone())
            .push_bind(self.subregion_id.clone())
            .push_bind(self.policy.clone())
            .push_bind(self.notes.clone())
            .push_bind(self.source.clone())
            .push_bind(self.issue_date)
            .push_bind(self.start_date)
            .push_bind(self.ease_date)
            .push_bind(self.expiration_date)
            .push_bind(self.end_date);
    }
}
