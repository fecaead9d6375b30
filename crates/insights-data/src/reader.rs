//! CSV file discovery and decoding for audit-log exports.
//!
//! Turns one CSV file, or a directory tree of them, into normalized
//! [`EventRecord`]s. A file that fails to decode fails as a whole; no
//! partially decoded rows are ever returned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use insights_core::error::{InsightsError, Result};
use insights_core::models::{EventRecord, RawRecord};
use tracing::{debug, info, warn};

use crate::normalizer::{normalize_batch, NormalizeStats};

// ── Public types ──────────────────────────────────────────────────────────────

/// Totals for one [`load_event_records`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub files: Vec<PathBuf>,
    pub normalize: NormalizeStats,
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find all `.csv` files recursively under `dir`, sorted by path.
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Input path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_csv_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// A file is taken as-is; a directory is searched with [`find_csv_files`].
pub fn resolve_input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        return Err(InsightsError::InputNotFound(input.to_path_buf()));
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let files = find_csv_files(input);
    if files.is_empty() {
        return Err(InsightsError::NoDataFiles(input.to_path_buf()));
    }
    Ok(files)
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode every row of one CSV file into a [`RawRecord`].
///
/// Header names are BOM-trimmed. Short rows leave the trailing columns
/// empty; cells beyond the header are ignored.
pub fn read_raw_records(path: &Path) -> Result<Vec<RawRecord>> {
    let decode_err = |source: csv::Error| InsightsError::CsvDecode {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::open(path).map_err(|source| InsightsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let headers: Vec<String> = reader
        .headers()
        .map_err(decode_err)?
        .iter()
        .map(|h| h.trim_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(decode_err)?;
        let row: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect();
        rows.push(RawRecord::from_row(&row));
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Discover, decode and normalize everything under `input`.
///
/// Records are concatenated in file order, then row order.
pub fn load_event_records(input: &Path) -> Result<(Vec<EventRecord>, LoadStats)> {
    let files = resolve_input_files(input)?;

    let mut records = Vec::new();
    let mut stats = LoadStats::default();
    for file in &files {
        let (batch, batch_stats) = normalize_batch(read_raw_records(file)?);
        records.extend(batch);
        stats.normalize.merge(&batch_stats);
    }
    stats.files = files;

    if records.is_empty() {
        return Err(InsightsError::NoValidRows(input.to_path_buf()));
    }

    info!(
        "Loaded {} records from {} file(s), {} rows dropped",
        records.len(),
        stats.files.len(),
        stats.normalize.rows_dropped
    );
    Ok((records, stats))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
