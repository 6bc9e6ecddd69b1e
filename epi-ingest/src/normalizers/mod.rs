//! Source normalizers
//!
//! Each upstream feed has its own shape; a [`Normalizer`] variant owns the
//! quirks of one shape and produces canonical records. Variants are chosen by
//! the source configuration, not by type.
//!
//! Normalization fails soft per row: a row that cannot be turned into a
//! record is dropped and counted. Only a payload that cannot be parsed at all
//! is an error.

pub mod episodes;
pub mod international_cases;
pub mod international_interventions;
pub mod us_cases;
pub mod us_interventions;

use crate::models::{CaseRecord, DatasetKind, InterventionRecord};
use chrono::NaiveDate;
use thiserror::Error;

/// Normalization errors
///
/// Payload-level variants (`Json`, `Csv`) reject a whole source; the others
/// describe why a single row was dropped.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed CSV payload: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Unparseable date '{0}'")]
    InvalidDate(String),

    #[error("Unparseable number '{0}'")]
    InvalidNumber(String),

    #[error("Unknown country code '{0}'")]
    UnknownRegion(String),

    #[error("Count overflow for {region} on {date}")]
    CountOverflow { region: String, date: NaiveDate },
}

/// Records produced by one source
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Cases(Vec<CaseRecord>),
    Interventions(Vec<InterventionRecord>),
}

impl Normalized {
    pub fn len(&self) -> usize {
        match self {
            Normalized::Cases(records) => records.len(),
            Normalized::Interventions(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-source normalization strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Normalizer {
    /// Daily per-state absolute totals with gaps
    UsCases,
    /// Daily per-country deltas
    InternationalCases,
    /// One row per state policy
    UsInterventions,
    /// One severity time series per country for a single policy
    InternationalInterventions { policy: String, threshold: f64 },
}

impl Normalizer {
    /// Dataset this normalizer's records belong to
    pub fn dataset(&self) -> DatasetKind {
        match self {
            Normalizer::UsCases | Normalizer::InternationalCases => DatasetKind::Cases,
            Normalizer::UsInterventions | Normalizer::InternationalInterventions { .. } => {
                DatasetKind::Interventions
            }
        }
    }

    /// Convert one raw payload into canonical records
    pub fn normalize(&self, raw: &str) -> Result<Normalized, NormalizeError> {
        match self {
            Normalizer::UsCases => us_cases::normalize(raw).map(Normalized::Cases),
            Normalizer::InternationalCases => {
                international_cases::normalize(raw).map(Normalized::Cases)
            }
            Normalizer::UsInterventions => {
                us_interventions::normalize(raw).map(Normalized::Interventions)
            }
            Normalizer::InternationalInterventions { policy, threshold } => {
                international_interventions::normalize(raw, policy, *threshold)
                    .map(Normalized::Interventions)
            }
        }
    }
}

/// Parse a date trying each `chrono` format in turn
pub(crate) fn parse_date(value: &str, formats: &[&str]) -> Result<NaiveDate, NormalizeError> {
    let trimmed = value.trim();
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| NormalizeError::InvalidDate(value.to_string()))
}

/// Trimmed, non-empty text or `None`
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Tally of rows kept and dropped by one normalizer call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowTally {
    pub kept: usize,
    pub dropped: usize,
}

impl RowTally {
    pub fn drop_row(&mut self, source: &'static str, error: &NormalizeError) {
        self.dropped += 1;
        tracing::debug!(source, error = %error, "Dropping malformed row");
    }

    pub fn log(&self, source: &'static str) {
        if self.dropped > 0 {
            tracing::info!(source, kept = self.kept, dropped = self.dropped, "Normalized rows");
        } else {
            tracing::debug!(source, kept = self.kept, "Normalized rows");
        }
    }
}
