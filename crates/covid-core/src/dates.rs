use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use regex::Regex;
use tracing::warn;

use crate::error::{CovidError, Result};

// ── Snapshot filenames ────────────────────────────────────────────────────────

fn snapshot_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{4})\.csv$").expect("regex is valid"))
}

/// Extract the report date from a snapshot filename such as `03-22-2020.csv`.
pub fn snapshot_date_from_filename(name: &str) -> Result<NaiveDate> {
    let invalid = || CovidError::InvalidFilenameDate(name.to_string());
    let caps = snapshot_name_regex().captures(name).ok_or_else(invalid)?;

    let month: u32 = caps[1].parse().map_err(|_| invalid())?;
    let day: u32 = caps[2].parse().map_err(|_| invalid())?;
    let year: i32 = caps[3].parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

// ── Date expressions ──────────────────────────────────────────────────────────

/// Parse a user-facing date expression relative to `today`.
///
/// Accepts `today`, `yesterday` and `tomorrow` (any case) as well as
/// `YYYY-MM-DD`, `MM/DD/YYYY` and `MM-DD-YYYY`.
pub fn parse_date_expr(expr: &str, today: NaiveDate) -> Result<NaiveDate> {
    let trimmed = expr.trim();
    match trimmed.to_lowercase().as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today - Duration::days(1)),
        "tomorrow" => return Ok(today + Duration::days(1)),
        _ => {}
    }

    const FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| CovidError::InvalidDate(expr.to_string()))
}

// ── Time zones ────────────────────────────────────────────────────────────────

/// Resolve a configured time-zone name; `"auto"` means the system zone.
///
/// Unknown names fall back to UTC with a warning.
pub fn resolve_timezone(name: &str) -> Tz {
    let resolved = if name.eq_ignore_ascii_case("auto") {
        iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
    } else {
        name.to_string()
    };
    resolved.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", resolved);
        Tz::UTC
    })
}

/// Calendar date of an epoch-millisecond timestamp, as seen in `tz`.
pub fn date_from_epoch_millis(millis: i64, tz: &Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.with_timezone(tz).date_naive())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── snapshot_date_from_filename ──────────────────────────────────────────

    #[test]
    fn test_snapshot_date_valid() {
        assert_eq!(
            snapshot_date_from_filename("03-22-2020.csv").unwrap(),
            ymd(2020, 3, 22)
        );
    }

    #[test]
    fn test_snapshot_date_rejects_other_names() {
        assert!(snapshot_date_from_filename("README.md").is_err());
        assert!(snapshot_date_from_filename("2020-03-22.csv").is_err());
        assert!(snapshot_date_from_filename("03-22-2020.csv.bak").is_err());
    }

    #[test]
    fn test_snapshot_date_rejects_impossible_date() {
        let err = snapshot_date_from_filename("02-30-2020.csv").unwrap_err();
        assert!(matches!(err, CovidError::InvalidFilenameDate(_)));
    }

    // ── parse_date_expr ───────────────────────────────────────────────────────

    #[test]
    fn test_parse_relative_words() {
        let today = ymd(2020, 7, 3);
        assert_eq!(parse_date_expr("today", today).unwrap(), today);
        assert_eq!(parse_date_expr("Yesterday", today).unwrap(), ymd(2020, 7, 2));
        assert_eq!(parse_date_expr("TOMORROW", today).unwrap(), ymd(2020, 7, 4));
    }

    #[test]
    fn test_parse_explicit_formats() {
        let today = ymd(2020, 7, 3);
        assert_eq!(parse_date_expr("2020-05-29", today).unwrap(), ymd(2020, 5, 29));
        assert_eq!(parse_date_expr("05/29/2020", today).unwrap(), ymd(2020, 5, 29));
        assert_eq!(parse_date_expr("05-29-2020", today).unwrap(), ymd(2020, 5, 29));
    }

    #[test]
    fn test_parse_invalid() {
        let err = parse_date_expr("next week", ymd(2020, 7, 3)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date: next week");
    }

    // ── time zones ────────────────────────────────────────────────────────────

    #[test]
    fn test_resolve_timezone_named_and_invalid() {
        assert_eq!(resolve_timezone("America/New_York"), Tz::America__New_York);
        assert_eq!(resolve_timezone("Mars/Olympus"), Tz::UTC);
    }

    #[test]
    fn test_date_from_epoch_millis_respects_zone() {
        // 2020-08-19T02:00:00Z is still the 18th in New York.
        let millis = 1_597_802_400_000;
        assert_eq!(
            date_from_epoch_millis(millis, &Tz::UTC),
            Some(ymd(2020, 8, 19))
        );
        assert_eq!(
            date_from_epoch_millis(millis, &Tz::America__New_York),
            Some(ymd(2020, 8, 18))
        );
    }
}
