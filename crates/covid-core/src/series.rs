//! Turn one location's dated counts into an ordered chart series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{SeriesPoint, ValueKind};
use crate::store::DatedCounts;

/// Moving-average window used for "new" series when none is configured.
pub const DEFAULT_NEW_VALUE_WINDOW: usize = 7;

// ── SeriesOptions ─────────────────────────────────────────────────────────────

/// Which values a series tracks and how it is derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesOptions {
    pub value: ValueKind,
    /// Chart first differences instead of cumulative totals.
    pub new_values: bool,
    /// Explicit moving-average window; see [`SeriesOptions::effective_window`].
    pub window: Option<usize>,
    /// Points dated after this are dropped.
    pub end_date: Option<NaiveDate>,
}

impl SeriesOptions {
    pub fn new(value: ValueKind, new_values: bool) -> Self {
        Self {
            value,
            new_values,
            ..Self::default()
        }
    }

    /// The window actually applied: the explicit one, otherwise
    /// [`DEFAULT_NEW_VALUE_WINDOW`] for new values and none for cumulative.
    pub fn effective_window(&self) -> Option<usize> {
        match self.window {
            Some(0) => None,
            Some(w) => Some(w),
            None if self.new_values => Some(DEFAULT_NEW_VALUE_WINDOW),
            None => None,
        }
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// Build the ascending series for one location.
///
/// New values are first differences (undefined on the first point). The
/// average, when a window applies, is taken over the selected values.
pub fn extract_series(dated: &DatedCounts, options: &SeriesOptions) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = Vec::with_capacity(dated.len());
    let mut previous = None;

    for (date, counts) in dated {
        if options.end_date.is_some_and(|end| *date > end) {
            break;
        }
        let (new_cases, new_deaths) = match previous {
            Some((cases, deaths)) => (
                Some(counts.cases as i64 - cases as i64),
                Some(counts.deaths as i64 - deaths as i64),
            ),
            None => (None, None),
        };
        previous = Some((counts.cases, counts.deaths));

        points.push(SeriesPoint {
            date: *date,
            cases: counts.cases,
            deaths: counts.deaths,
            new_cases,
            new_deaths,
            average: None,
        });
    }

    if let Some(window) = options.effective_window() {
        let selected = selected_values(&points, options);
        for (point, avg) in points.iter_mut().zip(moving_average(&selected, window)) {
            point.average = avg;
        }
    }

    points
}

/// The plotted value of every point, in order.
pub fn selected_values(points: &[SeriesPoint], options: &SeriesOptions) -> Vec<Option<f64>> {
    points
        .iter()
        .map(|p| p.selected(options.value, options.new_values))
        .collect()
}

/// Trailing mean over `window` values ending at each index.
///
/// The result is `None` until `window` values are available and wherever the
/// window covers an undefined value.
pub fn moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let sum = slice.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / window as f64)
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Counts;

    fn dated(values: &[(u64, u64)]) -> DatedCounts {
        values
            .iter()
            .enumerate()
            .map(|(i, (c, d))| {
                (
                    NaiveDate::from_ymd_opt(2020, 4, 1 + i as u32).unwrap(),
                    Counts::new(*c, *d),
                )
            })
            .collect()
    }

    // ── effective_window ──────────────────────────────────────────────────────

    #[test]
    fn test_effective_window_defaults() {
        assert_eq!(SeriesOptions::new(ValueKind::Cases, true).effective_window(), Some(7));
        assert_eq!(SeriesOptions::new(ValueKind::Cases, false).effective_window(), None);

        let explicit = SeriesOptions {
            window: Some(3),
            ..SeriesOptions::new(ValueKind::Cases, false)
        };
        assert_eq!(explicit.effective_window(), Some(3));
    }

    // ── moving_average ────────────────────────────────────────────────────────

    #[test]
    fn test_moving_average_window_three() {
        let values: Vec<Option<f64>> = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0]
            .into_iter()
            .map(Some)
            .collect();
        let avg = moving_average(&values, 3);
        assert_eq!(avg[0], None);
        assert_eq!(avg[1], None);
        assert_eq!(avg[2], Some(20.0));
        assert_eq!(avg[6], Some(60.0));
    }

    #[test]
    fn test_moving_average_undefined_input_propagates() {
        let values = vec![None, Some(2.0), Some(4.0), Some(6.0)];
        let avg = moving_average(&values, 2);
        assert_eq!(avg, vec![None, None, Some(3.0), Some(5.0)]);
    }

    // ── extract_series ────────────────────────────────────────────────────────

    #[test]
    fn test_new_values_are_first_difference() {
        let series = extract_series(
            &dated(&[(100, 1), (120, 1), (150, 3)]),
            &SeriesOptions::new(ValueKind::Cases, false),
        );
        let new: Vec<Option<i64>> = series.iter().map(|p| p.new_cases).collect();
        assert_eq!(new, vec![None, Some(20), Some(30)]);
        let new_deaths: Vec<Option<i64>> = series.iter().map(|p| p.new_deaths).collect();
        assert_eq!(new_deaths, vec![None, Some(0), Some(2)]);
    }

    #[test]
    fn test_negative_revision_kept() {
        let series = extract_series(
            &dated(&[(100, 0), (90, 0)]),
            &SeriesOptions::new(ValueKind::Cases, true),
        );
        assert_eq!(series[1].new_cases, Some(-10));
    }

    #[test]
    fn test_cumulative_series_has_no_average_by_default() {
        let series = extract_series(
            &dated(&[(1, 0), (2, 0), (3, 0)]),
            &SeriesOptions::new(ValueKind::Cases, false),
        );
        assert!(series.iter().all(|p| p.average.is_none()));
    }

    #[test]
    fn test_new_series_average_over_new_values() {
        let cumulative: Vec<(u64, u64)> = (0..9).map(|i| (i * 10, 0)).collect();
        let series = extract_series(
            &dated(&cumulative),
            &SeriesOptions::new(ValueKind::Cases, true),
        );
        // First new value is undefined, so the first full 7-day window ends at index 7.
        assert!(series[6].average.is_none());
        assert_eq!(series[7].average, Some(10.0));
        assert_eq!(series[8].average, Some(10.0));
    }

    #[test]
    fn test_end_date_truncates() {
        let options = SeriesOptions {
            end_date: NaiveDate::from_ymd_opt(2020, 4, 2),
            ..SeriesOptions::new(ValueKind::Deaths, false)
        };
        let series = extract_series(&dated(&[(1, 1), (2, 2), (3, 3)]), &options);
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().deaths, 2);
    }

    #[test]
    fn test_empty_input() {
        let series = extract_series(
            &DatedCounts::new(),
            &SeriesOptions::new(ValueKind::Cases, true),
        );
        assert!(series.is_empty());
    }
}
