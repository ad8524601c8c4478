//! Chart-request planning.
//!
//! Turns a [`Store`] plus a location request into fully derived chart data:
//! the ordered series, the x-axis window and a spike-robust y-axis bound.
//! Rendering is left to the consumer.
//!
//! Locations come from the settings: the remote source pins its one location,
//! otherwise a filter file or the country/state/county fields select them.
//! A single-location request fails on any error. A bulk request isolates
//! failures per location and reports the skipped keys.

use chrono::{Days, NaiveDate};
use covid_core::error::{CovidError, Result};
use covid_core::models::{Counts, FilterSpec, Level, LocationKey, SeriesPoint, ValueKind};
use covid_core::range::{estimate_upper_bound, SpikeConfig};
use covid_core::series::{extract_series, selected_values, SeriesOptions};
use covid_core::settings::{DataSource, Settings};
use covid_core::store::Store;
use covid_data::filter::{filter_locations, filter_locations_from_file, resolve_single};
use covid_data::remote::remote_location;
use serde::Serialize;
use tracing::{debug, info, warn};

// ── ChartOptions ──────────────────────────────────────────────────────────────

/// Everything needed to derive a chart besides the location.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub series: SeriesOptions,
    pub log_scale: bool,
    pub spike: SpikeConfig,
    /// Left edge of the x-axis; the first recorded date when unset.
    pub start_date: Option<NaiveDate>,
    /// Date relative expressions were resolved against.
    pub today: NaiveDate,
}

impl ChartOptions {
    pub fn new(series: SeriesOptions, today: NaiveDate) -> Self {
        Self {
            series,
            log_scale: false,
            spike: SpikeConfig::default(),
            start_date: None,
            today,
        }
    }

    /// Resolve the chart-related fields of `settings`.
    pub fn from_settings(settings: &Settings, today: NaiveDate) -> Result<Self> {
        Ok(Self {
            series: settings.series_options(today)?,
            log_scale: settings.log_scale,
            spike: settings.spike,
            start_date: settings.resolved_start_date(today)?,
            today,
        })
    }

    /// Same options for another value / new-values combination.
    pub fn variant(&self, value: ValueKind, new_values: bool) -> Self {
        Self {
            series: SeriesOptions {
                value,
                new_values,
                ..self.series.clone()
            },
            ..self.clone()
        }
    }
}

// ── ChartPlan ─────────────────────────────────────────────────────────────────

/// Derived data for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlan {
    pub key: LocationKey,
    pub level: Level,
    pub label: String,
    pub value: ValueKind,
    pub new_values: bool,
    pub points: Vec<SeriesPoint>,
    /// Moving-average window applied to `points`, if any.
    pub window: Option<usize>,
    pub x_start: NaiveDate,
    /// Right edge of the x-axis; `today` unless an end date was given.
    pub x_end: NaiveDate,
    /// `None` means autoscale (log axes and degenerate series).
    pub y_upper: Option<f64>,
}

impl ChartPlan {
    /// `"new cases"`, `"cumulative deaths"`, ...
    pub fn metric_label(&self) -> String {
        format!(
            "{} {}",
            if self.new_values { "new" } else { "cumulative" },
            self.value.as_str()
        )
    }

    /// Values the chart plots, aligned with `points`.
    pub fn values(&self) -> Vec<Option<f64>> {
        self.points
            .iter()
            .map(|p| p.selected(self.value, self.new_values))
            .collect()
    }
}

/// Latest counts of a location as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    pub key: LocationKey,
    pub date: NaiveDate,
    pub counts: Counts,
}

/// Outcome of [`plan_bulk`].
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub plans: Vec<ChartPlan>,
    pub summaries: Vec<LocationSummary>,
    /// Locations with no data, in request order.
    pub skipped: Vec<LocationKey>,
}

// ── Planning ──────────────────────────────────────────────────────────────────

/// Plan one chart for `key`. Fails with [`CovidError::EmptySeries`] when the
/// location has no points up to the end date.
pub fn plan_chart(store: &Store, key: &LocationKey, options: &ChartOptions) -> Result<ChartPlan> {
    let dated = store
        .get(key)
        .ok_or_else(|| CovidError::EmptySeries(key.clone()))?;
    let points = extract_series(dated, &options.series);
    let Some(first) = points.first() else {
        return Err(CovidError::EmptySeries(key.clone()));
    };

    let values = selected_values(&points, &options.series);
    let y_upper = estimate_upper_bound(&values, &options.spike, options.log_scale);

    let plan = ChartPlan {
        key: key.clone(),
        level: key.level(),
        label: key.label(),
        value: options.series.value,
        new_values: options.series.new_values,
        window: options.series.effective_window(),
        x_start: options.start_date.unwrap_or(first.date),
        x_end: options.series.end_date.unwrap_or(options.today),
        y_upper,
        points,
    };
    debug!(
        "Planned {} {}: {} points, y_upper = {:?}",
        plan.label,
        plan.metric_label(),
        plan.points.len(),
        plan.y_upper
    );
    Ok(plan)
}

/// Plan the chart for the single location `spec` selects.
///
/// Zero or several matches is [`CovidError::AmbiguousFilter`].
pub fn plan_single(store: &Store, spec: &FilterSpec, options: &ChartOptions) -> Result<ChartPlan> {
    let key = resolve_single(store.keys(), spec)?;
    plan_chart(store, &key, options)
}

/// Locations the run covers, sorted.
///
/// The remote source only ever holds [`remote_location`], so it overrides
/// every other filter. Otherwise a filter file wins over the
/// country/state/county fields.
pub fn select_locations(store: &Store, settings: &Settings) -> Result<Vec<LocationKey>> {
    if settings.source == DataSource::Remote {
        let spec = FilterSpec::from_key(&remote_location(), settings.recursive);
        return Ok(filter_locations(store.keys(), &spec));
    }
    match &settings.filter_file {
        Some(path) => filter_locations_from_file(&store.keys_sorted(), path, settings.recursive),
        None => Ok(filter_locations(store.keys(), &settings.filter_spec())),
    }
}

/// Plan the chart for the one location `settings` selects.
///
/// Zero or several matches is [`CovidError::AmbiguousFilter`].
pub fn plan_selected(store: &Store, settings: &Settings, options: &ChartOptions) -> Result<ChartPlan> {
    let mut keys = select_locations(store, settings)?;
    if keys.len() != 1 {
        return Err(CovidError::AmbiguousFilter {
            matches: keys.len(),
        });
    }
    plan_chart(store, &keys.remove(0), options)
}

/// Bulk-plan every location `settings` selects.
pub fn plan_selected_bulk(
    store: &Store,
    settings: &Settings,
    options: &ChartOptions,
) -> Result<BulkReport> {
    let keys = select_locations(store, settings)?;
    Ok(plan_bulk(store, &keys, options))
}

/// Latest counts for `key` on or before `end_date` (yesterday by default).
pub fn summarize(store: &Store, key: &LocationKey, options: &ChartOptions) -> Option<LocationSummary> {
    let end = options
        .series
        .end_date
        .or_else(|| options.today.checked_sub_days(Days::new(1)))?;
    store
        .latest_on_or_before(key, end)
        .map(|(date, counts)| LocationSummary {
            key: key.clone(),
            date,
            counts,
        })
}

/// The four variants planned per location in bulk mode.
const BULK_VARIANTS: [(ValueKind, bool); 4] = [
    (ValueKind::Deaths, true),
    (ValueKind::Cases, true),
    (ValueKind::Deaths, false),
    (ValueKind::Cases, false),
];

/// Plan every variant for every key, skipping locations without data.
pub fn plan_bulk(store: &Store, keys: &[LocationKey], options: &ChartOptions) -> BulkReport {
    let mut report = BulkReport::default();

    for (index, key) in keys.iter().enumerate() {
        info!(
            "location {} of {} ({:?}): {}",
            index + 1,
            keys.len(),
            key.level(),
            key.encode()
        );

        let planned: Result<Vec<ChartPlan>> = BULK_VARIANTS
            .iter()
            .map(|(value, new_values)| {
                plan_chart(store, key, &options.variant(*value, *new_values))
            })
            .collect();

        match planned {
            Ok(plans) => {
                report.plans.extend(plans);
                report.summaries.extend(summarize(store, key, options));
            }
            Err(e) => {
                warn!("Skipping {}: {}", key, e);
                report.skipped.push(key.clone());
            }
        }
    }

    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────
