//! Core types for the COVID-19 series tooling.
//!
//! Location keys, the typed location → date → counts store, run settings,
//! and the pure derivations charts are built from: series extraction and
//! spike-robust y-axis estimation.

pub mod dates;
pub mod error;
pub mod models;
pub mod range;
pub mod series;
pub mod settings;
pub mod store;

pub use error::{CovidError, Result};
