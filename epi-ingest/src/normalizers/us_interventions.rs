//! US state policy normalizer
//!
//! Input is a CSV with one row per state policy action. Dates are compact
//! (`20200316`) or ISO. A row needs a policy, a state and an enacted date;
//! the remaining dates are optional but must parse when present.

use super::{non_empty, parse_date, NormalizeError, RowTally};
use crate::models::{us_subregion_id, InterventionRecord, US_REGION_ID};
use chrono::NaiveDate;
use serde::Deserialize;

const SOURCE: &str = "us_interventions";
const DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d"];

#[derive(Debug, Deserialize)]
struct PolicyRow {
    #[serde(rename = "StatePostal")]
    state: Option<String>,
    #[serde(rename = "StatePolicy")]
    policy: Option<String>,
    #[serde(rename = "DateIssued")]
    issued: Option<String>,
    #[serde(rename = "DateEnacted")]
    enacted: Option<String>,
    #[serde(rename = "DateExpiry")]
    expiry: Option<String>,
    #[serde(rename = "DateEased")]
    eased: Option<String>,
    #[serde(rename = "DateEnded")]
    ended: Option<String>,
    #[serde(rename = "PolicyCodingNotes")]
    notes: Option<String>,
    #[serde(rename = "PolicySource")]
    source: Option<String>,
}

fn optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, NormalizeError> {
    non_empty(value)
        .map(|v| parse_date(v, DATE_FORMATS))
        .transpose()
}

impl TryFrom<PolicyRow> for InterventionRecord {
    type Error = NormalizeError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        let policy =
            non_empty(row.policy.as_deref()).ok_or(NormalizeError::MissingField("StatePolicy"))?;
        let state =
            non_empty(row.state.as_deref()).ok_or(NormalizeError::MissingField("StatePostal"))?;
        let enacted =
            non_empty(row.enacted.as_deref()).ok_or(NormalizeError::MissingField("DateEnacted"))?;

        Ok(InterventionRecord {
            region_id: US_REGION_ID.to_string(),
            subregion_id: Some(us_subregion_id(state)),
            policy: policy.to_string(),
            notes: non_empty(row.notes.as_deref()).map(str::to_string),
            source: non_empty(row.source.as_deref()).map(str::to_string),
            issue_date: optional_date(row.issued.as_deref())?,
            start_date: parse_date(enacted, DATE_FORMATS)?,
            ease_date: optional_date(row.eased.as_deref())?,
            expiration_date: optional_date(row.expiry.as_deref())?,
            end_date: optional_date(row.ended.as_deref())?,
        })
    }
}

pub fn normalize(raw: &str) -> Result<Vec<InterventionRecord>, NormalizeError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());
    // Surface an unreadable header as a payload error rather than per-row drops
    reader.headers()?;

    let mut tally = RowTally::default();
    let mut records = Vec::new();

    for row in reader.deserialize::<PolicyRow>() {
        let parsed = row
            .map_err(NormalizeError::from)
            .and_then(InterventionRecord::try_from);
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => tally.drop_row(SOURCE, &e),
        }
    }

    tally.kept = records.len();
    tally.log(SOURCE);

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "StatePostal,StateName,StatePolicy,Mandate,StateWide,Curfew,\
DateIssued,DateEnacted,DateExpiry,DateEased,DateEnded,DateReexpanded1,\
DateReeased1,PolicyCodingNotes,PolicySource,LastUpdated,LastUpdatedNotes";

    fn payload(rows: &[&str]) -> String {
        let mut raw = String::from(HEADER);
        for row in rows {
            raw.push('\n');
            raw.push_str(row);
        }
        raw.push('\n');
        raw
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    #[test]
    fn test_full_row_maps_every_field() {
        let raw = payload(&[
            "ny,New York,SchoolClose,1,1,0,20200315,20200316,20200415,,20200601,,,Closed statewide,https://example.gov/eo,20200701,",
        ]);

        let records = normalize(&raw).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.region_id, "US");
        assert_eq!(r.subregion_id.as_deref(), Some("US-NY"));
        assert_eq!(r.policy, "SchoolClose");
        assert_eq!(r.issue_date, Some(date(3, 15)));
        assert_eq!(r.start_date, date(3, 16));
        assert_eq!(r.expiration_date, Some(date(4, 15)));
        assert_eq!(r.ease_date, None);
        assert_eq!(r.end_date, Some(date(6, 1)));
        assert_eq!(r.notes.as_deref(), Some("Closed statewide"));
        assert_eq!(r.source.as_deref(), Some("https://example.gov/eo"));
    }

    #[test]
    fn test_row_without_start_date_dropped() {
        let raw = payload(&[
            "CA,California,StayAtHome,1,1,0,20200319,,,,,,,,,,",
            "CA,California,GathRestrict10,1,1,0,,2020-03-20,,,,,,,,,",
        ]);

        let records = normalize(&raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].policy, "GathRestrict10");
        assert_eq!(records[0].start_date, date(3, 20));
    }

    #[test]
    fn test_rows_missing_policy_or_state_dropped() {
        let raw = payload(&[
            "WA,Washington,,1,1,0,,20200320,,,,,,,,,",
            ",Unknown,SchoolClose,1,1,0,,20200320,,,,,,,,,",
            "WA,Washington,SchoolClose,1,1,0,,20200313,,,,,,,,,",
        ]);

        let records = normalize(&raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subregion_id.as_deref(), Some("US-WA"));
    }

    #[test]
    fn test_unparseable_optional_date_drops_row() {
        let raw = payload(&["TX,Texas,BarRestrict,1,1,0,,20200320,soon,,,,,,,,"]);
        assert!(normalize(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_empty_payload_yields_no_records() {
        assert!(normalize("").unwrap().is_empty());
        assert!(normalize(HEADER).unwrap().is_empty());
    }
}
