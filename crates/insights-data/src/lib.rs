//! Data layer for audit-log insights.
//!
//! Discovers and decodes CSV exports, normalizes rows into event records,
//! runs the report aggregators and writes the results out.

pub mod aggregator;
pub mod analysis;
pub mod normalizer;
pub mod reader;

pub use insights_core as core;
