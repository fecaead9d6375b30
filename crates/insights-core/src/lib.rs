//! Core types for audit-log insights.
//!
//! Record model, error type, settings, time handling, metadata extraction,
//! derived-metric calculations, formatting and export flattening. Nothing in
//! this crate reads input files; see `insights-data` for ingestion and the
//! aggregators.

pub mod calculations;
pub mod data_processors;
pub mod error;
pub mod export;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{InsightsError, Result};
