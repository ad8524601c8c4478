//! Snapshot discovery and CSV loading.
//!
//! A snapshot directory holds one `MM-DD-YYYY.csv` daily report per date.
//! Files are turned into normalised [`RawRow`]s for the aggregator.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use covid_core::dates::snapshot_date_from_filename;
use covid_core::error::{CovidError, Result};
use covid_core::models::RawRow;
use tracing::{debug, warn};

use crate::schema::{RawFields, SchemaNormalizer};

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// All normalised rows of one dated report.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub rows: Vec<RawRow>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.csv` files directly inside `dir`, sorted by path.
pub fn find_snapshot_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Snapshot directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "csv")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read one snapshot file.
///
/// Fails when the filename carries no date or the file cannot be opened.
/// Individual malformed records are skipped.
pub fn read_snapshot(path: &Path, normalizer: &SchemaNormalizer) -> Result<Snapshot> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let date = snapshot_date_from_filename(name)?;

    let file = std::fs::File::open(path).map_err(|source| CovidError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_rows(file, date, normalizer, path)?;

    debug!("File {}: {} rows for {}", path.display(), rows.len(), date);

    Ok(Snapshot {
        date,
        path: path.to_path_buf(),
        rows,
    })
}

/// Read every snapshot in `dir`, skipping files that fail with a warning.
///
/// Returned in date order (filenames sort month-first, not chronologically).
pub fn load_snapshots(dir: &Path, normalizer: &SchemaNormalizer) -> Vec<Snapshot> {
    let mut snapshots: Vec<Snapshot> = find_snapshot_files(dir)
        .iter()
        .filter_map(|path| match read_snapshot(path, normalizer) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    snapshots.sort_by_key(|s| s.date);
    snapshots
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Decode CSV text into rows dated `date`.
///
/// Fields are decoded lossily, so a record with stray non-UTF-8 bytes keeps
/// its counts; only structurally broken records are dropped.
fn read_rows<R: std::io::Read>(
    input: R,
    date: NaiveDate,
    normalizer: &SchemaNormalizer,
    path: &Path,
) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.byte_records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // +2: header line plus 1-based numbering.
                warn!("{}:{}: skipping record: {}", path.display(), idx + 2, e);
                continue;
            }
        };
        let fields: RawFields = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|f| String::from_utf8_lossy(f).into_owned()))
            .collect();
        rows.push(normalizer.normalize(&fields, date));
    }
    Ok(rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    const EARLY: &str = "Province/State,Country/Region,Last Update,Confirmed,Deaths,Recovered\n\
                         \"Chicago, IL\",US,2020-02-09T19:03:03,2,0,2\n\
                         ,Italy,2020-02-09T19:03:03,3,,0\n";

    const LATE: &str = "FIPS,Admin2,Province_State,Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,Recovered,Active,Combined_Key\n\
                        45001,Abbeville,South Carolina,US,2020-04-10 22:54:07,34.2,-82.4,7,0,0,0,\"Abbeville, South Carolina, US\"\n\
                        22001,Acadia,Louisiana,US,2020-04-10 22:54:07,30.2,-92.4,94,4,0,0,\"Acadia, Louisiana, US\"\n";

    // ── find_snapshot_files ───────────────────────────────────────────────────

    #[test]
    fn test_find_snapshot_files_sorted_csv_only() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "02-01-2020.csv", EARLY);
        write_file(dir.path(), "01-22-2020.csv", EARLY);
        write_file(dir.path(), "README.md", "docs");

        let files = find_snapshot_files(dir.path());
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["01-22-2020.csv", "02-01-2020.csv"]);
    }

    #[test]
    fn test_find_snapshot_files_nonexistent_path() {
        let files = find_snapshot_files(Path::new("/tmp/does-not-exist-covid-test-xyz"));
        assert!(files.is_empty());
    }

    // ── read_snapshot ─────────────────────────────────────────────────────────

    #[test]
    fn test_read_early_era_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "02-09-2020.csv", EARLY);

        let snapshot = read_snapshot(&path, &SchemaNormalizer::default()).unwrap();
        assert_eq!(snapshot.date, NaiveDate::from_ymd_opt(2020, 2, 9).unwrap());
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].state.as_deref(), Some("Chicago, IL"));
        assert_eq!(snapshot.rows[1].state, None);
        assert_eq!(snapshot.rows[1].country.as_deref(), Some("Italy"));
        assert_eq!(snapshot.rows[1].deaths, 0);
    }

    #[test]
    fn test_read_late_era_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "04-10-2020.csv", LATE);

        let snapshot = read_snapshot(&path, &SchemaNormalizer::default()).unwrap();
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[1].county.as_deref(), Some("Acadia"));
        assert_eq!(snapshot.rows[1].cases, 94);
        assert_eq!(snapshot.rows[1].deaths, 4);
    }

    #[test]
    fn test_read_snapshot_strips_bom() {
        let dir = TempDir::new().unwrap();
        let content = "\u{feff}Country/Region,Confirmed,Deaths\nUS,5,1\n";
        let path = write_file(dir.path(), "03-01-2020.csv", content);

        let snapshot = read_snapshot(&path, &SchemaNormalizer::default()).unwrap();
        assert_eq!(snapshot.rows[0].country.as_deref(), Some("US"));
    }

    #[test]
    fn test_read_snapshot_bad_filename() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "latest.csv", EARLY);

        let err = read_snapshot(&path, &SchemaNormalizer::default()).unwrap_err();
        assert!(matches!(err, CovidError::InvalidFilenameDate(_)));
    }

    #[test]
    fn test_read_snapshot_keeps_non_utf8_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("03-22-2020.csv");
        let mut content = b"Country/Region,Province/State,Confirmed,Deaths\nUS,Ohio,10,1\n".to_vec();
        content.extend_from_slice(b"Cura\xe7ao,,7,0\n");
        std::fs::write(&path, content).unwrap();

        let snapshot = read_snapshot(&path, &SchemaNormalizer::default()).unwrap();
        assert_eq!(snapshot.rows.len(), 2);
        let total: u64 = snapshot.rows.iter().map(|r| r.cases).sum();
        assert_eq!(total, 17);
        let country = snapshot.rows[1].country.as_deref().unwrap();
        assert!(country.starts_with("Cura"));
        assert!(country.ends_with("ao"));
    }

    // ── load_snapshots ────────────────────────────────────────────────────────

    #[test]
    fn test_load_snapshots_skips_undated_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "02-09-2020.csv", EARLY);
        write_file(dir.path(), "notes.csv", EARLY);
        write_file(dir.path(), "01-02-2021.csv", LATE);

        let snapshots = load_snapshots(dir.path(), &SchemaNormalizer::default());
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].date, NaiveDate::from_ymd_opt(2020, 2, 9).unwrap());
        assert_eq!(snapshots[1].date, NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
    }
}
