//! International intervention normalizer
//!
//! One CSV per policy type. Each row is a country's daily severity series:
//!
//! ```text
//! country_code,country_name,01Jan2020,02Jan2020,03Jan2020
//! FRA,France,0,2,3
//! ```
//!
//! The country code column is found by name (`country_code`), otherwise the
//! first column is used. Codes resolve to alpha-2 (`FRA` becomes `FR`) and a
//! row with an unknown code is dropped. Columns whose header parses as a date
//! form the series; any other column is ignored. Each row collapses into
//! episodes against the policy's severity threshold.

use super::episodes::collapse;
use super::{non_empty, parse_date, NormalizeError, RowTally};
use crate::models::InterventionRecord;
use crate::regions::canonical_region_id;
use chrono::NaiveDate;

const SOURCE: &str = "international_interventions";
const CODE_COLUMN: &str = "country_code";
const DATE_FORMATS: &[&str] = &["%d%b%Y", "%Y-%m-%d"];

pub fn normalize(
    raw: &str,
    policy: &str,
    threshold: f64,
) -> Result<Vec<InterventionRecord>, NormalizeError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = reader.headers()?.clone();
    let code_index = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(CODE_COLUMN))
        .unwrap_or(0);
    let date_columns: Vec<(usize, NaiveDate)> = headers
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != code_index)
        .filter_map(|(index, header)| parse_date(header, DATE_FORMATS).ok().map(|d| (index, d)))
        .collect();

    let mut tally = RowTally::default();
    let mut records = Vec::new();

    for row in reader.records() {
        let parsed = row
            .map_err(NormalizeError::from)
            .and_then(|row| parse_series(&row, code_index, &date_columns));
        let (region_id, series) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                tally.drop_row(SOURCE, &e);
                continue;
            }
        };

        records.extend(collapse(series, threshold).into_iter().map(|episode| {
            InterventionRecord {
                region_id: region_id.clone(),
                subregion_id: None,
                policy: policy.to_string(),
                notes: None,
                source: None,
                issue_date: None,
                start_date: episode.start,
                ease_date: None,
                expiration_date: None,
                end_date: episode.end,
            }
        }));
    }

    tally.kept = records.len();
    tally.log(SOURCE);

    Ok(records)
}

type Series = Vec<(NaiveDate, Option<f64>)>;

fn parse_series(
    row: &csv::StringRecord,
    code_index: usize,
    date_columns: &[(usize, NaiveDate)],
) -> Result<(String, Series), NormalizeError> {
    let code = non_empty(row.get(code_index)).ok_or(NormalizeError::MissingField(CODE_COLUMN))?;
    let region_id =
        canonical_region_id(code).ok_or_else(|| NormalizeError::UnknownRegion(code.to_string()))?;

    let mut series = Series::with_capacity(date_columns.len());
    for (index, date) in date_columns {
        let severity = match non_empty(row.get(*index)) {
            Some(cell) => Some(
                cell.parse::<f64>()
                    .map_err(|_| NormalizeError::InvalidNumber(cell.to_string()))?,
            ),
            None => None,
        };
        series.push((*date, severity));
    }

    Ok((region_id, series))
}
