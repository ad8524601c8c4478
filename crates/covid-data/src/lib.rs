//! Data ingestion layer for the COVID-19 series tooling.
//!
//! Responsible for discovering and reading dated CSV snapshots, normalising
//! their evolving schema, rolling rows up into the location store, decoding
//! the remote single-location feed and resolving location filters.

pub mod aggregator;
pub mod filter;
pub mod pipeline;
pub mod reader;
pub mod remote;
pub mod schema;

pub use covid_core as core;
