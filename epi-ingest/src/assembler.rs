//! Dataset assembly
//!
//! Runs every source payload through its normalizer and concatenates the
//! results, in source order, into the case and intervention datasets.

use crate::models::{CaseRecord, InterventionRecord};
use crate::normalizers::Normalized;
use crate::sources::SourceSpec;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

pub const CASE_DEBUG_FILE: &str = "case-data.json";
pub const INTERVENTION_DEBUG_FILE: &str = "intervention-data.json";

/// Both datasets for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    pub cases: Vec<CaseRecord>,
    pub interventions: Vec<InterventionRecord>,
}

/// Normalize each `(source, payload)` pair and concatenate by dataset
///
/// A payload that cannot be parsed at all is logged and contributes no rows.
pub fn assemble<'a, I>(payloads: I) -> Datasets
where
    I: IntoIterator<Item = (&'a SourceSpec, &'a str)>,
{
    let mut datasets = Datasets::default();

    for (source, raw) in payloads {
        match source.normalizer.normalize(raw) {
            Ok(normalized) => {
                info!(source = %source.name, records = normalized.len(), "Normalized source");
                match normalized {
                    Normalized::Cases(records) => datasets.cases.extend(records),
                    Normalized::Interventions(records) => datasets.interventions.extend(records),
                }
            }
            Err(e) => {
                error!(
                    source = %source.name,
                    error = %e,
                    "Source payload unreadable; contributing no records"
                );
            }
        }
    }

    info!(
        cases = datasets.cases.len(),
        interventions = datasets.interventions.len(),
        "Assembled datasets"
    );
    datasets
}

/// Write both datasets as JSON arrays of field-ordered tuples
///
/// Failures are logged and otherwise ignored.
pub async fn write_debug_output(dir: &Path, datasets: &Datasets) {
    let cases: Vec<_> = datasets.cases.iter().map(CaseRecord::as_tuple).collect();
    let interventions: Vec<_> = datasets
        .interventions
        .iter()
        .map(InterventionRecord::as_tuple)
        .collect();

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!(dir = %dir.display(), error = %e, "Cannot create debug output directory");
        return;
    }

    write_json(&dir.join(CASE_DEBUG_FILE), &cases).await;
    write_json(&dir.join(INTERVENTION_DEBUG_FILE), &interventions).await;
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) {
    let json = match serde_json::to_vec(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot serialize debug output");
            return;
        }
    };

    match tokio::fs::write(path, &json).await {
        Ok(()) => info!(path = %path.display(), bytes = json.len(), "Wrote debug output"),
        Err(e) => warn!(path = %path.display(), error = %e, "Cannot write debug output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizers::Normalizer;
    use tempfile::TempDir;

    fn source(name: &str, normalizer: Normalizer) -> SourceSpec {
        SourceSpec::new(name, format!("http://localhost/{}", name), normalizer)
    }

    #[test]
    fn test_assemble_routes_by_dataset_in_source_order() {
        let us = source("us_cases", Normalizer::UsCases);
        let intl = source("international_cases", Normalizer::InternationalCases);
        let policy = source("us_interventions", Normalizer::UsInterventions);

        let us_raw = r#"[{"date": 20200301, "state": "NY", "positive": 1, "recovered": null, "death": 0}]"#;
        let intl_raw = r#"{"records": [{"dateRep": "01/03/2020", "cases": 2, "deaths": 0, "geoId": "FR"}]}"#;
        let policy_raw = "StatePostal,StatePolicy,DateEnacted\nNY,SchoolClose,20200316\n";

        let datasets = assemble([
            (&us, us_raw),
            (&intl, intl_raw),
            (&policy, policy_raw),
        ]);

        assert_eq!(datasets.cases.len(), 2);
        assert_eq!(datasets.cases[0].region_id, "US");
        assert_eq!(datasets.cases[1].region_id, "FR");
        assert_eq!(datasets.interventions.len(), 1);
    }

    #[test]
    fn test_assembled_cases_have_unique_keys() {
        let us = source("us_cases", Normalizer::UsCases);
        let intl = source("international_cases", Normalizer::InternationalCases);

        let us_raw = r#"[
            {"date": 20200302, "state": "NY", "positive": 3, "recovered": null, "death": 0},
            {"date": 20200301, "state": "NY", "positive": 1, "recovered": null, "death": 0},
            {"date": 20200301, "state": "WA", "positive": 2, "recovered": 1, "death": 0}
        ]"#;
        let intl_raw = r#"{"records": [
            {"dateRep": "01/03/2020", "cases": 2, "deaths": 0, "geoId": "UK"},
            {"dateRep": "01/03/2020", "cases": 1, "deaths": 0, "geoId": "GB"},
            {"dateRep": "01/03/2020", "cases": 9, "deaths": 0, "geoId": "US"},
            {"dateRep": "02/03/2020", "cases": 4, "deaths": 1, "geoId": "GB"}
        ]}"#;

        let datasets = assemble([(&us, us_raw), (&intl, intl_raw)]);

        let keys: std::collections::HashSet<_> =
            datasets.cases.iter().map(CaseRecord::key).collect();
        assert_eq!(datasets.cases.len(), 5);
        assert_eq!(keys.len(), datasets.cases.len());
    }

    #[test]
    fn test_unreadable_payload_contributes_nothing() {
        let us = source("us_cases", Normalizer::UsCases);
        let intl = source("international_cases", Normalizer::InternationalCases);
        let intl_raw = r#"{"records": [{"dateRep": "01/03/2020", "cases": 2, "deaths": 0, "geoId": "FR"}]}"#;

        let datasets = assemble([(&us, "<html>Service Unavailable</html>"), (&intl, intl_raw)]);

        assert_eq!(datasets.cases.len(), 1);
        assert_eq!(datasets.cases[0].region_id, "FR");
    }

    #[tokio::test]
    async fn test_debug_output_written_as_tuples() {
        let dir = TempDir::new().unwrap();
        let intl = source("international_cases", Normalizer::InternationalCases);
        let raw = r#"{"records": [{"dateRep": "01/03/2020", "cases": 5, "deaths": 1, "geoId": "UK"}]}"#;
        let datasets = assemble([(&intl, raw)]);

        let out = dir.path().join("debug");
        write_debug_output(&out, &datasets).await;

        let cases = std::fs::read_to_string(out.join(CASE_DEBUG_FILE)).unwrap();
        assert_eq!(cases, r#"[["GB",null,"2020-03-01",5,0,1]]"#);
        let interventions = std::fs::read_to_string(out.join(INTERVENTION_DEBUG_FILE)).unwrap();
        assert_eq!(interventions, "[]");
    }

    #[tokio::test]
    async fn test_debug_output_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        // Directory creation fails because a file occupies the path
        write_debug_output(&blocker, &Datasets::default()).await;
        assert!(blocker.is_file());
    }
}
