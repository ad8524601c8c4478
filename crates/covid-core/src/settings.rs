use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dates::{parse_date_expr, resolve_timezone};
use crate::error::{CovidError, Result};
use crate::models::{FilterSpec, ValueKind};
use crate::range::SpikeConfig;
use crate::series::SeriesOptions;

/// Default location of the daily report snapshots inside a checkout of the
/// JHU CSSE repository.
pub const DEFAULT_DATA_DIR: &str = "COVID-19/csse_covid_19_data/csse_covid_19_daily_reports";

// ── DataSource ────────────────────────────────────────────────────────────────

/// Where counts are ingested from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// A directory of dated CSV snapshots.
    #[default]
    Snapshots,
    /// A single-location remote feed of cumulative counts.
    Remote,
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Run configuration, persisted as JSON. Every field has a default, so a
/// partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: DataSource,
    pub data_dir: PathBuf,

    pub country: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    /// Include every sub-division beneath the given fields.
    pub recursive: bool,
    /// File of encoded location keys, one filter per line.
    pub filter_file: Option<PathBuf>,

    pub value: ValueKind,
    pub new_values: bool,
    /// Moving-average window; defaults to 7 for new values.
    pub average_window: Option<usize>,
    pub log_scale: bool,
    /// Date expressions (`today`, `yesterday`, `YYYY-MM-DD`, ...).
    pub start_date: Option<String>,
    pub end_date: Option<String>,

    /// IANA zone used to date remote timestamps; `"auto"` is the system zone.
    pub timezone: String,
    pub spike: SpikeConfig,

    pub log_level: String,
    /// Raises logging to debug and logs per-location match details.
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: DataSource::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            country: None,
            state: None,
            county: None,
            recursive: false,
            filter_file: None,
            value: ValueKind::Cases,
            new_values: false,
            average_window: None,
            log_scale: false,
            start_date: None,
            end_date: None,
            timezone: "auto".to_string(),
            spike: SpikeConfig::default(),
            log_level: "INFO".to_string(),
            debug: false,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CovidError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Atomically write settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Reject values no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.spike.max_jump <= 1.0 {
            return Err(CovidError::Config(format!(
                "spike.max_jump must be greater than 1, got {}",
                self.spike.max_jump
            )));
        }
        if self.spike.margin < 1.0 {
            return Err(CovidError::Config(format!(
                "spike.margin must be at least 1, got {}",
                self.spike.margin
            )));
        }
        if self.average_window == Some(0) {
            return Err(CovidError::Config(
                "average_window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective log level: `debug` overrides the configured level.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Location filter built from the country/state/county fields.
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new(
            self.country.as_deref(),
            self.state.as_deref(),
            self.county.as_deref(),
            self.recursive,
        )
    }

    /// Moving-average window a chart would use with these settings.
    pub fn effective_window(&self) -> Option<usize> {
        SeriesOptions {
            window: self.average_window,
            ..SeriesOptions::new(self.value, self.new_values)
        }
        .effective_window()
    }

    /// Series options with the end date resolved against `today`.
    pub fn series_options(&self, today: NaiveDate) -> Result<SeriesOptions> {
        Ok(SeriesOptions {
            value: self.value,
            new_values: self.new_values,
            window: self.average_window,
            end_date: self.resolved_end_date(today)?,
        })
    }

    pub fn resolved_start_date(&self, today: NaiveDate) -> Result<Option<NaiveDate>> {
        self.start_date
            .as_deref()
            .map(|expr| parse_date_expr(expr, today))
            .transpose()
    }

    pub fn resolved_end_date(&self, today: NaiveDate) -> Result<Option<NaiveDate>> {
        self.end_date
            .as_deref()
            .map(|expr| parse_date_expr(expr, today))
            .transpose()
    }

    pub fn resolved_timezone(&self) -> Tz {
        resolve_timezone(&self.timezone)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
