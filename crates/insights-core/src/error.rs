use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the audit-insights crates.
///
/// The aggregation engine never fails; these variants only surface at the
/// I/O boundaries (reading CSV exports, writing reports, loading settings).
#[derive(Error, Debug)]
pub enum InsightsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV export could not be decoded. The whole file is rejected.
    #[error("Failed to decode CSV {path}: {source}")]
    CsvDecode {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The input path given on the command line does not exist.
    #[error("Input path not found: {0}")]
    InputNotFound(PathBuf),

    /// No CSV files were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// Every decoded row was dropped by the normalizer.
    #[error("No valid rows found in {0}")]
    NoValidRows(PathBuf),

    /// A report could not be flattened or written.
    #[error("Export error: {0}")]
    Export(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the insights crates.
pub type Result<T> = std::result::Result<T, InsightsError>;
