//! Canonical record shapes shared by every source

use chrono::NaiveDate;
use std::fmt;

/// Region code of the US national feed
///
/// International case rows carrying this code are dropped because the US
/// feed is authoritative for the region.
pub const US_REGION_ID: &str = "US";

/// Cumulative case counts for one region (or subregion) on one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    /// ISO 3166-1 alpha-2 country code
    pub region_id: String,
    /// ISO 3166-2 subdivision code, `None` for country-level rows
    pub subregion_id: Option<String>,
    pub date: NaiveDate,
    pub confirmed: i64,
    pub recovered: i64,
    pub deaths: i64,
}

/// Row layout used for debug output: the canonical field order as a tuple
pub type CaseTuple<'a> = (&'a str, Option<&'a str>, NaiveDate, i64, i64, i64);

impl CaseRecord {
    /// Identity of the record within a run
    pub fn key(&self) -> (&str, Option<&str>, NaiveDate) {
        (&self.region_id, self.subregion_id.as_deref(), self.date)
    }

    pub fn as_tuple(&self) -> CaseTuple<'_> {
        (
            &self.region_id,
            self.subregion_id.as_deref(),
            self.date,
            self.confirmed,
            self.recovered,
            self.deaths,
        )
    }
}

/// One policy intervention for a region
///
/// `start_date` is not optional: rows without one never become records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionRecord {
    pub region_id: String,
    pub subregion_id: Option<String>,
    pub policy: String,
    pub notes: Option<String>,
    pub source: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub start_date: NaiveDate,
    pub ease_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Row layout used for debug output: the canonical field order as a tuple
pub type InterventionTuple<'a> = (
    &'a str,
    Option<&'a str>,
    &'a str,
    Option<&'a str>,
    Option<&'a str>,
    Option<NaiveDate>,
    NaiveDate,
    Option<NaiveDate>,
    Option<NaiveDate>,
    Option<NaiveDate>,
);

impl InterventionRecord {
    pub fn as_tuple(&self) -> InterventionTuple<'_> {
        (
            &self.region_id,
            self.subregion_id.as_deref(),
            &self.policy,
            self.notes.as_deref(),
            self.source.as_deref(),
            self.issue_date,
            self.start_date,
            self.ease_date,
            self.expiration_date,
            self.end_date,
        )
    }
}

/// ISO 3166-2 code for a US state postal code (`"ny"` → `"US-NY"`)
pub fn us_subregion_id(state: &str) -> String {
    format!("{}-{}", US_REGION_ID, state.trim().to_ascii_uppercase())
}

/// The two independently loaded datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Cases,
    Interventions,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Cases => write!(f, "cases"),
            DatasetKind::Interventions => write!(f, "interventions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_subregion_id_normalizes_case() {
        assert_eq!(us_subregion_id(" ny "), "US-NY");
    }

    #[test]
    fn test_case_tuple_serializes_in_field_order() {
        let record = CaseRecord {
            region_id: "GB".to_string(),
            subregion_id: None,
            date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            confirmed: 5,
            recovered: 0,
            deaths: 1,
        };
        let json = serde_json::to_string(&record.as_tuple()).unwrap();
        assert_eq!(json, r#"["GB",null,"2020-03-01",5,0,1]"#);
    }
}
