//! Source registry
//!
//! The six upstream feeds, each paired with the normalizer that understands
//! it. URLs can be overridden per source name from the config file; the
//! pairing itself is fixed.

use crate::normalizers::Normalizer;
use std::collections::BTreeMap;

/// One upstream feed
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    /// Stable name used in config overrides and logs
    pub name: String,
    pub url: String,
    pub normalizer: Normalizer,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>, normalizer: Normalizer) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            normalizer,
        }
    }
}

pub const US_CASES_URL: &str = "https://covidtracking.com/api/v1/states/daily.json";
pub const INTERNATIONAL_CASES_URL: &str =
    "https://opendata.ecdc.europa.eu/covid19/casedistribution/json/";
pub const US_INTERVENTIONS_URL: &str = "https://raw.githubusercontent.com/COVID19StatePolicy/SocialDistancing/master/data/USstatesCov19distancingpolicy.csv";

const OXCGRT_TIMESERIES_BASE: &str =
    "https://raw.githubusercontent.com/OxCGRT/covid-policy-tracker/master/data/timeseries";

/// International policy series: (source name, policy label, file, severity threshold)
const INTERNATIONAL_POLICIES: &[(&str, &str, &str, f64)] = &[
    ("school_closures", "school_closure", "c1_school_closing.csv", 2.0),
    (
        "gathering_restrictions",
        "gathering_restriction",
        "c4_restrictions_on_gatherings.csv",
        3.0,
    ),
    ("stay_at_home", "stay_at_home", "c6_stay_at_home_requirements.csv", 2.0),
];

/// Every source in load order: cases first, then interventions
pub fn default_sources() -> Vec<SourceSpec> {
    let mut sources = vec![
        SourceSpec::new("us_cases", US_CASES_URL, Normalizer::UsCases),
        SourceSpec::new(
            "international_cases",
            INTERNATIONAL_CASES_URL,
            Normalizer::InternationalCases,
        ),
        SourceSpec::new(
            "us_interventions",
            US_INTERVENTIONS_URL,
            Normalizer::UsInterventions,
        ),
    ];

    sources.extend(
        INTERNATIONAL_POLICIES
            .iter()
            .map(|(name, policy, file, threshold)| {
                SourceSpec::new(
                    *name,
                    format!("{}/{}", OXCGRT_TIMESERIES_BASE, file),
                    Normalizer::InternationalInterventions {
                        policy: (*policy).to_string(),
                        threshold: *threshold,
                    },
                )
            }),
    );

    sources
}

/// Replace source URLs by name
///
/// Names that match no source are logged and ignored.
pub fn apply_overrides(sources: &mut [SourceSpec], overrides: &BTreeMap<String, String>) {
    for (name, url) in overrides {
        match sources.iter_mut().find(|s| &s.name == name) {
            Some(source) => {
                tracing::info!(source = %name, url = %url, "Source URL overridden");
                source.url = url.clone();
            }
            None => tracing::warn!(source = %name, "Ignoring override for unknown source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatasetKind;

    #[test]
    fn test_default_sources_cover_both_datasets() {
        let sources = default_sources();
        assert_eq!(sources.len(), 6);

        let cases = sources
            .iter()
            .filter(|s| s.normalizer.dataset() == DatasetKind::Cases)
            .count();
        assert_eq!(cases, 2);

        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "us_cases",
                "international_cases",
                "us_interventions",
                "school_closures",
                "gathering_restrictions",
                "stay_at_home",
            ]
        );
    }

    #[test]
    fn test_international_policy_thresholds() {
        let sources = default_sources();
        let gatherings = sources
            .iter()
            .find(|s| s.name == "gathering_restrictions")
            .unwrap();
        assert_eq!(
            gatherings.normalizer,
            Normalizer::InternationalInterventions {
                policy: "gathering_restriction".to_string(),
                threshold: 3.0,
            }
        );
        assert!(gatherings.url.ends_with("/c4_restrictions_on_gatherings.csv"));
    }

    #[test]
    fn test_overrides_replace_known_urls_only() {
        let mut sources = default_sources();
        let mut overrides = BTreeMap::new();
        overrides.insert("us_cases".to_string(), "http://mirror/us.json".to_string());
        overrides.insert("no_such_feed".to_string(), "http://mirror/x".to_string());

        apply_overrides(&mut sources, &overrides);

        assert_eq!(sources[0].url, "http://mirror/us.json");
        assert_eq!(sources[1].url, INTERNATIONAL_CASES_URL);
        assert_eq!(sources.len(), 6);
    }
}
