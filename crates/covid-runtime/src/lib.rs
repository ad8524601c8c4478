//! Runtime layer for the COVID-19 series tooling.
//!
//! Parallel snapshot ingestion, chart-request planning with per-location
//! error isolation, and logging/settings bootstrap.

pub mod bootstrap;
pub mod orchestrator;
pub mod planner;

pub use covid_core as core;
pub use covid_data as data;
