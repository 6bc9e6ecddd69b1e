//! Schemas of the two live tables read by downstream consumers

use super::schema::{ColumnDefinition, TableSchema};

/// Cumulative case counts per region and day
pub struct CasesTableSchema;

impl TableSchema for CasesTableSchema {
    fn table_name() -> &'static str {
        "cases"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("region_id", "TEXT").not_null(),
            ColumnDefinition::new("subregion_id", "TEXT"),
            ColumnDefinition::new("date", "TEXT").not_null(),
            ColumnDefinition::new("confirmed", "INTEGER").not_null().check("confirmed >= 0"),
            ColumnDefinition::new("recovered", "INTEGER").not_null().check("recovered >= 0"),
            ColumnDefinition::new("deaths", "INTEGER").not_null().check("deaths >= 0"),
        ]
    }
}

/// Policy interventions per region
pub struct InterventionsTableSchema;

impl TableSchema for InterventionsTableSchema {
    fn table_name() -> &'static str {
        "interventions"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("region_id", "TEXT").not_null(),
            ColumnDefinition::new("subregion_id", "TEXT"),
            ColumnDefinition::new("policy", "TEXT").not_null(),
            ColumnDefinition::new("notes", "TEXT"),
            ColumnDefinition::new("source", "TEXT"),
            ColumnDefinition::new("issue_date", "TEXT"),
            ColumnDefinition::new("start_date", "TEXT").not_null(),
            ColumnDefinition::new("ease_date", "TEXT"),
            ColumnDefinition::new("expiration_date", "TEXT"),
            ColumnDefinition::new("end_date", "TEXT"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cases_column_order() {
        assert_eq!(
            CasesTableSchema::column_list(),
            "region_id, subregion_id, date, confirmed, recovered, deaths"
        );
    }

    #[test]
    fn test_interventions_column_order() {
        assert_eq!(
            InterventionsTableSchema::column_list(),
            "region_id, subregion_id, policy, notes, source, issue_date, start_date, \
             ease_date, expiration_date, end_date"
        );
    }
}
