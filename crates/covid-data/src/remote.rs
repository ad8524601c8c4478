//! Decoding of the single-location remote feed.
//!
//! The feed answers one query per metric with a nested report document whose
//! rows live under `results[0].result.data.dsr.DS[0].PH[0].DM0[*].C`. Each
//! `C` array starts with an epoch-millisecond timestamp followed by one or
//! two numeric columns; the cumulative count's column depends on the metric.
//! Transport is left to a [`RemoteSource`] implementation.

use std::path::PathBuf;

use chrono_tz::Tz;
use covid_core::dates::date_from_epoch_millis;
use covid_core::error::{CovidError, Result};
use covid_core::models::{Counts, LocationKey};
use covid_core::store::Store;
use serde_json::Value;
use tracing::{debug, info};

// ── Metric ────────────────────────────────────────────────────────────────────

/// A cumulative series the remote feed can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteMetric {
    Cases,
    Deaths,
}

impl RemoteMetric {
    /// Number of entries in a data row of this metric's response.
    pub fn row_width(&self) -> usize {
        match self {
            RemoteMetric::Cases => 3,
            RemoteMetric::Deaths => 2,
        }
    }

    /// Column holding the cumulative count.
    pub fn value_index(&self) -> usize {
        match self {
            RemoteMetric::Cases => 2,
            RemoteMetric::Deaths => 1,
        }
    }

    fn counts(&self, value: u64) -> Counts {
        match self {
            RemoteMetric::Cases => Counts::new(value, 0),
            RemoteMetric::Deaths => Counts::new(0, value),
        }
    }
}

/// The one location the remote feed reports on.
pub fn remote_location() -> LocationKey {
    LocationKey::new(Some("US"), Some("North Carolina"), Some("Wake"))
}

// ── Sources ───────────────────────────────────────────────────────────────────

/// Anything that can answer a metric query with the raw response document.
pub trait RemoteSource {
    fn fetch(&self, metric: RemoteMetric) -> Result<Value>;
}

/// Responses saved to disk, one JSON document per metric.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub cases_path: PathBuf,
    pub deaths_path: PathBuf,
}

impl RemoteSource for FileSource {
    fn fetch(&self, metric: RemoteMetric) -> Result<Value> {
        let path = match metric {
            RemoteMetric::Cases => &self.cases_path,
            RemoteMetric::Deaths => &self.deaths_path,
        };
        let content = std::fs::read_to_string(path).map_err(|source| CovidError::FileRead {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Extract `(epoch_millis, cumulative)` pairs from a response document.
///
/// Rows whose length differs from `width` are skipped; a missing path or a
/// non-numeric entry in a kept row is a [`CovidError::SourceFetch`].
pub fn decode_pairs(value: &Value, width: usize, value_index: usize) -> Result<Vec<(i64, u64)>> {
    let rows = value
        .pointer("/results/0/result/data/dsr/DS/0/PH/0/DM0")
        .and_then(Value::as_array)
        .ok_or_else(|| CovidError::SourceFetch("response has no DM0 row set".to_string()))?;

    let mut pairs = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let Some(columns) = row.get("C").and_then(Value::as_array) else {
            return Err(CovidError::SourceFetch(format!("row {idx} has no C array")));
        };
        if columns.len() != width {
            continue;
        }
        let millis = columns
            .first()
            .and_then(as_integer)
            .ok_or_else(|| CovidError::SourceFetch(format!("row {idx}: bad timestamp")))?;
        let cumulative = columns
            .get(value_index)
            .and_then(as_integer)
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| CovidError::SourceFetch(format!("row {idx}: bad count")))?;
        pairs.push((millis, cumulative));
    }
    Ok(pairs)
}

/// Integral JSON numbers, also accepting floats with no fractional part.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}

/// Build a single-location [`Store`] from both metrics of `source`.
///
/// Dates are taken in `tz`. Each metric's zero cells are then carried
/// forward from the previous date, since each query only reports its own
/// column.
pub fn ingest_remote(source: &dyn RemoteSource, key: &LocationKey, tz: &Tz) -> Result<Store> {
    let mut store = Store::new();

    for metric in [RemoteMetric::Cases, RemoteMetric::Deaths] {
        let response = source.fetch(metric)?;
        let pairs = decode_pairs(&response, metric.row_width(), metric.value_index())?;
        debug!("Remote {:?}: {} data rows", metric, pairs.len());

        for (millis, cumulative) in pairs {
            let date = date_from_epoch_millis(millis, tz).ok_or_else(|| {
                CovidError::SourceFetch(format!("timestamp out of range: {millis}"))
            })?;
            store.add(key.clone(), date, metric.counts(cumulative));
        }
    }

    store.fill_forward_zeros(key);
    info!(
        "Remote source: {} dates for {}",
        store.get(key).map(|d| d.len()).unwrap_or(0),
        key
    );
    Ok(store)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    // 2020-04-01T12:00:00Z and the following two days.
    const APR_1: i64 = 1_585_742_400_000;
    const DAY: i64 = 86_400_000;

    fn response(rows: Vec<Value>) -> Value {
        let dm0: Vec<Value> = rows.into_iter().map(|c| json!({ "C": c })).collect();
        json!({
            "results": [{
                "result": { "data": { "dsr": { "DS": [{ "PH": [{ "DM0": dm0 }] }] } } }
            }]
        })
    }

    struct StubSource {
        cases: Value,
        deaths: Value,
    }

    impl RemoteSource for StubSource {
        fn fetch(&self, metric: RemoteMetric) -> Result<Value> {
            Ok(match metric {
                RemoteMetric::Cases => self.cases.clone(),
                RemoteMetric::Deaths => self.deaths.clone(),
            })
        }
    }

    struct FailingSource;

    impl RemoteSource for FailingSource {
        fn fetch(&self, _metric: RemoteMetric) -> Result<Value> {
            Err(CovidError::SourceFetch("connection refused".to_string()))
        }
    }

    fn wake() -> LocationKey {
        remote_location()
    }

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    // ── decode_pairs ──────────────────────────────────────────────────────────

    #[test]
    fn test_decode_keeps_rows_of_matching_width() {
        let doc = response(vec![
            json!([APR_1, 4, 100]),
            json!([APR_1 + DAY, 120]),
            json!([APR_1 + 2 * DAY, 6, 126]),
        ]);
        let pairs = decode_pairs(&doc, 3, 2).unwrap();
        assert_eq!(pairs, vec![(APR_1, 100), (APR_1 + 2 * DAY, 126)]);
    }

    #[test]
    fn test_decode_accepts_integral_floats() {
        let doc = response(vec![json!([APR_1 as f64, 7.0])]);
        assert_eq!(decode_pairs(&doc, 2, 1).unwrap(), vec![(APR_1, 7)]);
    }

    #[test]
    fn test_decode_missing_path() {
        let err = decode_pairs(&json!({ "results": [] }), 3, 2).unwrap_err();
        assert!(matches!(err, CovidError::SourceFetch(_)));
    }

    #[test]
    fn test_decode_non_numeric_count() {
        let doc = response(vec![json!([APR_1, "many"])]);
        assert!(matches!(
            decode_pairs(&doc, 2, 1).unwrap_err(),
            CovidError::SourceFetch(_)
        ));
    }

    // ── ingest_remote ─────────────────────────────────────────────────────────

    #[test]
    fn test_ingest_merges_metrics_and_fills_forward() {
        let source = StubSource {
            cases: response(vec![
                json!([APR_1, 4, 100]),
                json!([APR_1 + DAY, 5, 105]),
                json!([APR_1 + 2 * DAY, 6, 111]),
            ]),
            deaths: response(vec![json!([APR_1, 2]), json!([APR_1 + 2 * DAY, 3])]),
        };

        let store = ingest_remote(&source, &wake(), &Tz::UTC).unwrap();
        assert_eq!(store.len(), 1);

        let dates = store.get(&wake()).unwrap();
        assert_eq!(dates[&ymd(4, 1)], Counts::new(100, 2));
        // No deaths row for 04-02: carried from 04-01.
        assert_eq!(dates[&ymd(4, 2)], Counts::new(105, 2));
        assert_eq!(dates[&ymd(4, 3)], Counts::new(111, 3));
    }

    #[test]
    fn test_ingest_dates_follow_timezone() {
        // 2020-04-01T02:00:00Z is still March 31 in New York.
        let early = APR_1 - 10 * 3_600_000;
        let source = StubSource {
            cases: response(vec![json!([early, 1, 10])]),
            deaths: response(vec![]),
        };
        let store = ingest_remote(&source, &wake(), &chrono_tz::America::New_York).unwrap();
        assert!(store.get(&wake()).unwrap().contains_key(&ymd(3, 31)));
    }

    #[test]
    fn test_ingest_propagates_fetch_failure() {
        let err = ingest_remote(&FailingSource, &wake(), &Tz::UTC).unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_file_source() {
        let dir = TempDir::new().unwrap();
        let cases_path = dir.path().join("cases.json");
        let deaths_path = dir.path().join("deaths.json");
        std::fs::write(&cases_path, response(vec![json!([APR_1, 1, 9])]).to_string()).unwrap();
        std::fs::write(&deaths_path, response(vec![json!([APR_1, 1])]).to_string()).unwrap();

        let source = FileSource {
            cases_path,
            deaths_path,
        };
        let store = ingest_remote(&source, &wake(), &Tz::UTC).unwrap();
        assert_eq!(store.get(&wake()).unwrap()[&ymd(4, 1)], Counts::new(9, 1));
    }

    #[test]
    fn test_file_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let source = FileSource {
            cases_path: dir.path().join("cases.json"),
            deaths_path: dir.path().join("deaths.json"),
        };
        assert!(matches!(
            source.fetch(RemoteMetric::Cases).unwrap_err(),
            CovidError::FileRead { .. }
        ));
    }
}
