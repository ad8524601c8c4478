use std::path::PathBuf;
use thiserror::Error;

use crate::models::LocationKey;

/// All errors produced by the COVID-19 series tooling.
#[derive(Error, Debug)]
pub enum CovidError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot table could not be decoded.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A date expression did not match any recognised format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A snapshot filename does not embed an `MM-DD-YYYY` date.
    #[error("No snapshot date in filename: {0}")]
    InvalidFilenameDate(String),

    /// A single-location request resolved to zero or several locations.
    #[error("Ambiguous filters, matches {matches} locations")]
    AmbiguousFilter { matches: usize },

    /// A resolved location has no recorded data.
    #[error("No data recorded for {0}")]
    EmptySeries(LocationKey),

    /// The remote data source failed or answered with an unexpected shape.
    #[error("Source fetch failed: {0}")]
    SourceFetch(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the workspace crates.
pub type Result<T> = std::result::Result<T, CovidError>;
