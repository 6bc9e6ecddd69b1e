//! US state case normalizer
//!
//! Input is a JSON array of daily per-state snapshots with absolute totals:
//!
//! ```json
//! [{"date": 20200401, "state": "NY", "positive": 83712, "recovered": null, "death": 1941}]
//! ```
//!
//! Any metric may be null on a given day. Snapshots are replayed in date
//! order and each state carries its last known value forward, starting from
//! zero, so every emitted series is non-decreasing.

use super::{non_empty, parse_date, NormalizeError, RowTally};
use crate::models::{us_subregion_id, CaseRecord, US_REGION_ID};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

const SOURCE: &str = "us_cases";
const DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d"];

/// Dates arrive as `20200401` or `"2020-04-01"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateField {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    date: Option<DateField>,
    state: Option<String>,
    positive: Option<i64>,
    recovered: Option<i64>,
    death: Option<i64>,
}

#[derive(Debug)]
struct Snapshot {
    date: NaiveDate,
    state: String,
    confirmed: Option<i64>,
    recovered: Option<i64>,
    deaths: Option<i64>,
}

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = NormalizeError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        let state = non_empty(raw.state.as_deref())
            .ok_or(NormalizeError::MissingField("state"))?
            .to_ascii_uppercase();
        let date = match raw.date.ok_or(NormalizeError::MissingField("date"))? {
            DateField::Number(n) => parse_date(&n.to_string(), DATE_FORMATS)?,
            DateField::Text(s) => parse_date(&s, DATE_FORMATS)?,
        };

        Ok(Self {
            date,
            state,
            confirmed: raw.positive,
            recovered: raw.recovered,
            deaths: raw.death,
        })
    }
}

/// Running state for one US state
#[derive(Debug, Default)]
struct CarryForward {
    confirmed: i64,
    recovered: i64,
    deaths: i64,
    /// Date and output position of the last record emitted for this state
    last_emitted: Option<(NaiveDate, usize)>,
}

impl CarryForward {
    fn advance(&mut self, snapshot: &Snapshot) {
        self.confirmed = carry(self.confirmed, snapshot.confirmed);
        self.recovered = carry(self.recovered, snapshot.recovered);
        self.deaths = carry(self.deaths, snapshot.deaths);
    }
}

/// Missing values keep the last known total; totals never move backwards
fn carry(last: i64, value: Option<i64>) -> i64 {
    value.map_or(last, |v| v.max(last))
}

pub fn normalize(raw: &str) -> Result<Vec<CaseRecord>, NormalizeError> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let mut tally = RowTally::default();

    let mut snapshots: Vec<Snapshot> = Vec::with_capacity(rows.len());
    for row in rows {
        let parsed = serde_json::from_value::<RawSnapshot>(row)
            .map_err(NormalizeError::from)
            .and_then(Snapshot::try_from);
        match parsed {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => tally.drop_row(SOURCE, &e),
        }
    }

    // Stable: same-day rows for a state keep their feed order
    snapshots.sort_by(|a, b| a.date.cmp(&b.date));

    let mut states: HashMap<String, CarryForward> = HashMap::new();
    let mut records: Vec<CaseRecord> = Vec::with_capacity(snapshots.len());

    for snapshot in &snapshots {
        let running = states.entry(snapshot.state.clone()).or_default();
        running.advance(snapshot);

        let record = CaseRecord {
            region_id: US_REGION_ID.to_string(),
            subregion_id: Some(us_subregion_id(&snapshot.state)),
            date: snapshot.date,
            confirmed: running.confirmed,
            recovered: running.recovered,
            deaths: running.deaths,
        };

        match running.last_emitted {
            // A repeated day supersedes the earlier row for that day
            Some((date, index)) if date == snapshot.date => records[index] = record,
            _ => {
                running.last_emitted = Some((snapshot.date, records.len()));
                records.push(record);
            }
        }
    }

    tally.kept = records.len();
    tally.log(SOURCE);

    Ok(records)
}
