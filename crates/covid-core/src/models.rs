use std::fmt;
use std::ops::AddAssign;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wildcard marker used in the encoded `country|state|county` form.
pub const WILDCARD: &str = "*";

/// Separator between the three fields of an encoded location key.
pub const KEY_SEPARATOR: char = '|';

// ── LocationKey ───────────────────────────────────────────────────────────────

/// Roll-up level of a [`LocationKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Global,
    Country,
    State,
    County,
}

/// Composite identifier of one geographic roll-up level.
///
/// `None` is the wildcard ("unspecified") and is distinct from every concrete
/// string. The derived ordering puts wildcards first, so sorting a key set
/// lists each parent ahead of its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub country: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
}

impl LocationKey {
    pub fn new(country: Option<&str>, state: Option<&str>, county: Option<&str>) -> Self {
        Self {
            country: country.map(str::to_string),
            state: state.map(str::to_string),
            county: county.map(str::to_string),
        }
    }

    /// The all-wildcard key holding world-wide totals.
    pub fn global() -> Self {
        Self::default()
    }

    /// Most specific level at which this key carries a concrete value.
    pub fn level(&self) -> Level {
        if self.county.is_some() {
            Level::County
        } else if self.state.is_some() {
            Level::State
        } else if self.country.is_some() {
            Level::Country
        } else {
            Level::Global
        }
    }

    /// Storage / filter-file encoding: `country|state|county`, `*` for wildcards.
    pub fn encode(&self) -> String {
        let field = |f: &Option<String>| f.clone().unwrap_or_else(|| WILDCARD.to_string());
        format!(
            "{}{sep}{}{sep}{}",
            field(&self.country),
            field(&self.state),
            field(&self.county),
            sep = KEY_SEPARATOR
        )
    }

    /// Decode one encoded line. Returns `None` unless the line has exactly
    /// three `|`-separated fields.
    pub fn decode(line: &str) -> Option<Self> {
        let mut parts = line.split(KEY_SEPARATOR);
        let country = parts.next()?;
        let state = parts.next()?;
        let county = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        let field = |s: &str| {
            let s = s.trim();
            if s == WILDCARD || s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };
        Some(Self {
            country: field(country),
            state: field(state),
            county: field(county),
        })
    }

    /// Human-readable label, e.g. `Wake, North Carolina [US]`.
    pub fn label(&self) -> String {
        let country = self.country.as_deref().unwrap_or("");
        let state = self.state.as_deref().unwrap_or("");
        match (&self.country, &self.state, &self.county) {
            (_, _, Some(county)) => format!("{}, {} [{}]", county, state, country),
            (_, Some(state), None) => format!("{} [{}]", state, country),
            (Some(country), None, None) => format!("{} [all]", country),
            (None, None, None) => "[all]".to_string(),
        }
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ── Counts ────────────────────────────────────────────────────────────────────

/// Cumulative case and death totals for one location on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub cases: u64,
    pub deaths: u64,
}

impl Counts {
    pub fn new(cases: u64, deaths: u64) -> Self {
        Self { cases, deaths }
    }

    pub fn get(&self, value: ValueKind) -> u64 {
        match value {
            ValueKind::Cases => self.cases,
            ValueKind::Deaths => self.deaths,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Self) {
        self.cases += rhs.cases;
        self.deaths += rhs.deaths;
    }
}

// ── RawRow ────────────────────────────────────────────────────────────────────

/// One normalised snapshot record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub country: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
}

impl RawRow {
    pub fn counts(&self) -> Counts {
        Counts::new(self.cases, self.deaths)
    }

    /// The four roll-up keys this row contributes to, from global down to
    /// county. Levels collapse to equal keys when state or county is wildcard.
    pub fn candidate_keys(&self) -> [LocationKey; 4] {
        let country = self.country.as_deref();
        let state = self.state.as_deref();
        let county = self.county.as_deref();
        [
            LocationKey::global(),
            LocationKey::new(country, None, None),
            LocationKey::new(country, state, None),
            LocationKey::new(country, state, county),
        ]
    }
}

// ── FilterSpec ────────────────────────────────────────────────────────────────

/// Location filter: the fields to match plus whether descendants are included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub country: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    #[serde(default)]
    pub recursive: bool,
}

impl FilterSpec {
    pub fn new(
        country: Option<&str>,
        state: Option<&str>,
        county: Option<&str>,
        recursive: bool,
    ) -> Self {
        Self {
            country: country.map(str::to_string),
            state: state.map(str::to_string),
            county: county.map(str::to_string),
            recursive,
        }
    }

    /// Build a filter selecting exactly `key` (and its descendants when
    /// `recursive`).
    pub fn from_key(key: &LocationKey, recursive: bool) -> Self {
        Self {
            country: key.country.clone(),
            state: key.state.clone(),
            county: key.county.clone(),
            recursive,
        }
    }

    /// Whether `key` satisfies this filter.
    ///
    /// Every field the filter gives must equal the key's field. Without
    /// `recursive`, unspecified filter fields must also be wildcards in the key.
    pub fn matches(&self, key: &LocationKey) -> bool {
        let field_matches = |filter: &Option<String>, value: &Option<String>| match filter {
            Some(wanted) => value.as_deref() == Some(wanted.as_str()),
            None => self.recursive || value.is_none(),
        };
        field_matches(&self.country, &key.country)
            && field_matches(&self.state, &key.state)
            && field_matches(&self.county, &key.county)
    }
}

// ── Series ────────────────────────────────────────────────────────────────────

/// Which cumulative count a series tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Cases,
    Deaths,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Cases => "cases",
            ValueKind::Deaths => "deaths",
        }
    }
}

/// One dated point of an extracted series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
    /// First difference of `cases`; `None` on the first point.
    pub new_cases: Option<i64>,
    /// First difference of `deaths`; `None` on the first point.
    pub new_deaths: Option<i64>,
    /// Trailing moving average of the selected values, when defined.
    pub average: Option<f64>,
}

impl SeriesPoint {
    /// The value a chart plots for this point.
    pub fn selected(&self, value: ValueKind, new_values: bool) -> Option<f64> {
        match (value, new_values) {
            (ValueKind::Cases, false) => Some(self.cases as f64),
            (ValueKind::Deaths, false) => Some(self.deaths as f64),
            (ValueKind::Cases, true) => self.new_cases.map(|v| v as f64),
            (ValueKind::Deaths, true) => self.new_deaths.map(|v| v as f64),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
