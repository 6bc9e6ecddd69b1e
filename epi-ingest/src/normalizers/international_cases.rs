//! International case normalizer
//!
//! Input is a JSON document of daily per-country *new* cases and deaths:
//!
//! ```json
//! {"records": [{"dateRep": "15/03/2020", "cases": 342, "deaths": 10, "geoId": "UK"}]}
//! ```
//!
//! Rows are grouped by country, ordered by date and summed into cumulative
//! totals. The US is left to the US feed, country codes are resolved to
//! ISO 3166-1 alpha-2, and `recovered` is not published so it is always 0.
//! A row whose count would overflow a total is dropped.

use super::{non_empty, parse_date, NormalizeError, RowTally};
use crate::models::{CaseRecord, US_REGION_ID};
use crate::regions::canonical_region_id;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

const SOURCE: &str = "international_cases";
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped { records: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

/// Counts are published as numbers or numeric strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    fn value(&self) -> Result<i64, NormalizeError> {
        match self {
            Count::Number(n) => Ok(*n),
            Count::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| NormalizeError::InvalidNumber(s.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDelta {
    #[serde(rename = "dateRep")]
    date_rep: Option<String>,
    cases: Option<Count>,
    deaths: Option<Count>,
    #[serde(rename = "geoId")]
    geo_id: Option<String>,
}

#[derive(Debug)]
struct Delta {
    country: String,
    date: NaiveDate,
    cases: i64,
    deaths: i64,
}

impl TryFrom<RawDelta> for Delta {
    type Error = NormalizeError;

    fn try_from(raw: RawDelta) -> Result<Self, Self::Error> {
        let geo_id = non_empty(raw.geo_id.as_deref()).ok_or(NormalizeError::MissingField("geoId"))?;
        let date_rep =
            non_empty(raw.date_rep.as_deref()).ok_or(NormalizeError::MissingField("dateRep"))?;

        Ok(Self {
            country: canonical_region_id(geo_id)
                .ok_or_else(|| NormalizeError::UnknownRegion(geo_id.to_string()))?,
            date: parse_date(date_rep, DATE_FORMATS)?,
            cases: raw.cases.ok_or(NormalizeError::MissingField("cases"))?.value()?,
            deaths: raw.deaths.ok_or(NormalizeError::MissingField("deaths"))?.value()?,
        })
    }
}

/// Running sum for one country
#[derive(Debug, Default)]
struct RunningTotal {
    confirmed: i64,
    deaths: i64,
}

impl RunningTotal {
    /// Add one day's deltas; on overflow the total is left unchanged
    fn add(&mut self, cases: i64, deaths: i64) -> Option<()> {
        let confirmed = self.confirmed.checked_add(cases)?;
        let deaths = self.deaths.checked_add(deaths)?;
        self.confirmed = confirmed;
        self.deaths = deaths;
        Some(())
    }
}

pub fn normalize(raw: &str) -> Result<Vec<CaseRecord>, NormalizeError> {
    let rows = match serde_json::from_str::<Payload>(raw)? {
        Payload::Wrapped { records } => records,
        Payload::Bare(records) => records,
    };
    let mut tally = RowTally::default();
    let mut excluded = 0usize;

    // country -> date -> (new cases, new deaths); same-day rows are summed
    let mut grouped: BTreeMap<String, BTreeMap<NaiveDate, (i64, i64)>> = BTreeMap::new();

    for row in rows {
        let parsed = serde_json::from_value::<RawDelta>(row)
            .map_err(NormalizeError::from)
            .and_then(Delta::try_from);
        let delta = match parsed {
            Ok(delta) => delta,
            Err(e) => {
                tally.drop_row(SOURCE, &e);
                continue;
            }
        };

        if delta.country == US_REGION_ID {
            excluded += 1;
            continue;
        }

        let day = grouped
            .entry(delta.country.clone())
            .or_default()
            .entry(delta.date)
            .or_insert((0, 0));
        match (day.0.checked_add(delta.cases), day.1.checked_add(delta.deaths)) {
            (Some(cases), Some(deaths)) => *day = (cases, deaths),
            _ => tally.drop_row(
                SOURCE,
                &NormalizeError::CountOverflow {
                    region: delta.country,
                    date: delta.date,
                },
            ),
        }
    }

    let mut records = Vec::new();
    for (country, days) in grouped {
        let mut running = RunningTotal::default();
        for (date, (cases, deaths)) in days {
            if running.add(cases, deaths).is_none() {
                tally.drop_row(
                    SOURCE,
                    &NormalizeError::CountOverflow {
                        region: country.clone(),
                        date,
                    },
                );
                continue;
            }
            records.push(CaseRecord {
                region_id: country.clone(),
                subregion_id: None,
                date,
                // Upstream corrections can push a running sum below zero
                confirmed: running.confirmed.max(0),
                recovered: 0,
                deaths: running.deaths.max(0),
            });
        }
    }

    if excluded > 0 {
        tracing::debug!(source = SOURCE, rows = excluded, "Skipped rows covered by the US feed");
    }
    tally.kept = records.len();
    tally.log(SOURCE);

    Ok(records)
}
