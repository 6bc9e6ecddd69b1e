//! Severity series → intervention episodes
//!
//! A day whose severity is at or above the threshold opens an episode; the
//! first later day below the threshold closes it, and that day becomes the
//! episode's end date. Days without an observation neither open nor close an
//! episode. An episode still open when the series ends has no end date.

use chrono::NaiveDate;

/// Contiguous period during which a policy is considered active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Episode {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

/// Collapse a daily severity series into episodes
///
/// The series may be in any order; it is sorted by date first.
pub fn collapse(mut series: Vec<(NaiveDate, Option<f64>)>, threshold: f64) -> Vec<Episode> {
    series.sort_by_key(|(date, _)| *date);

    let mut episodes = Vec::new();
    let mut open: Option<NaiveDate> = None;

    for (date, severity) in series {
        let Some(severity) = severity else {
            continue;
        };
        let active = severity >= threshold;

        match (open, active) {
            (None, true) => open = Some(date),
            (Some(start), false) => {
                episodes.push(Episode {
                    start,
                    end: Some(date),
                });
                open = None;
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        episodes.push(Episode { start, end: None });
    }

    episodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    fn series(values: &[Option<f64>]) -> Vec<(NaiveDate, Option<f64>)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (day(i as u32 + 1), *v))
            .collect()
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let episodes = collapse(series(&[Some(1.0), Some(2.0), Some(2.0), Some(1.0)]), 2.0);
        assert_eq!(
            episodes,
            vec![Episode {
                start: day(2),
                end: Some(day(4)),
            }]
        );
    }

    #[test]
    fn test_open_episode_at_series_end() {
        let episodes = collapse(series(&[Some(0.0), Some(3.0), Some(3.0)]), 2.0);
        assert_eq!(episodes, vec![Episode { start: day(2), end: None }]);
    }

    #[test]
    fn test_multiple_episodes() {
        let episodes = collapse(
            series(&[Some(2.0), Some(0.0), Some(0.0), Some(3.0), Some(1.0)]),
            2.0,
        );
        assert_eq!(
            episodes,
            vec![
                Episode { start: day(1), end: Some(day(2)) },
                Episode { start: day(4), end: Some(day(5)) },
            ]
        );
    }

    #[test]
    fn test_missing_days_do_not_break_episode() {
        let episodes = collapse(series(&[Some(2.0), None, None, Some(2.0), Some(0.0)]), 2.0);
        assert_eq!(
            episodes,
            vec![Episode {
                start: day(1),
                end: Some(day(5)),
            }]
        );
    }

    #[test]
    fn test_never_reaching_threshold_yields_nothing() {
        assert!(collapse(series(&[Some(1.0), None, Some(1.9)]), 2.0).is_empty());
        assert!(collapse(Vec::new(), 2.0).is_empty());
    }

    #[test]
    fn test_unsorted_series_sorted_first() {
        let mut input = series(&[Some(0.0), Some(2.0), Some(0.0)]);
        input.reverse();
        let episodes = collapse(input, 2.0);
        assert_eq!(
            episodes,
            vec![Episode {
                start: day(2),
                end: Some(day(3)),
            }]
        );
    }
}
