use std::path::Path;

use anyhow::Context;
use covid_core::settings::Settings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a configured level name to an `EnvFilter` directive.
///
/// Accepts the classic `DEBUG/INFO/WARNING/ERROR/CRITICAL` names as well as
/// tracing's own; anything else maps to `"info"`.
fn level_directive(log_level: &str, debug: bool) -> &'static str {
    if debug {
        return "debug";
    }
    match log_level.to_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// `debug` overrides `log_level`. Unrecognised levels fall back to `"info"`.
/// Returns `Ok(false)` when a subscriber was already installed, so repeated
/// calls are harmless.
pub fn setup_logging(log_level: &str, debug: bool) -> anyhow::Result<bool> {
    let directive = level_directive(log_level, debug);
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer().with_target(false).with_thread_ids(false);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_ok();

    Ok(installed)
}

// ── Settings bootstrap ─────────────────────────────────────────────────────────

/// Load settings from `path`, or the defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
