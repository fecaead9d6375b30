//! Flattening and writing of report rows.
//!
//! Any report row that serializes to a JSON object can be flattened:
//! arrays become a `"; "`-joined string plus a sibling `<key>_count`
//! column, nested objects become one `<key>_<subkey>` column per entry,
//! timestamps are already ISO-8601 strings and scalars pass through.

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{InsightsError, Result};

/// Separator placed between list elements in a flattened cell.
pub const EXPORT_DELIMITER: &str = "; ";

/// One flattened row; keys keep the field order of the source struct.
pub type FlatRow = Map<String, Value>;

// ── Flattening ────────────────────────────────────────────────────────────────

/// Flatten every row of a report.
pub fn flatten_for_export<T: Serialize>(rows: &[T]) -> Result<Vec<FlatRow>> {
    rows.iter()
        .map(|row| flatten_value(&serde_json::to_value(row)?))
        .collect()
}

/// Flatten a single serialized row. The value must be a JSON object.
pub fn flatten_value(value: &Value) -> Result<FlatRow> {
    let Value::Object(fields) = value else {
        return Err(InsightsError::Export(
            "export rows must serialize to JSON objects".to_string(),
        ));
    };

    let mut flat = FlatRow::new();
    for (key, value) in fields {
        match value {
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(cell_text)
                    .collect::<Vec<_>>()
                    .join(EXPORT_DELIMITER);
                flat.insert(key.clone(), Value::String(joined));
                flat.insert(format!("{}_count", key), Value::from(items.len()));
            }
            Value::Object(sub_fields) => {
                for (sub_key, sub_value) in sub_fields {
                    flat.insert(format!("{}_{}", key, sub_key), sub_value.clone());
                }
            }
            scalar => {
                flat.insert(key.clone(), scalar.clone());
            }
        }
    }
    Ok(flat)
}

/// Split a joined list cell back into its elements.
pub fn split_joined(cell: &str) -> Vec<String> {
    if cell.is_empty() {
        return Vec::new();
    }
    cell.split(EXPORT_DELIMITER).map(str::to_string).collect()
}

/// Text of a value as it appears inside a CSV cell.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

// ── Writers ───────────────────────────────────────────────────────────────────

/// Write flattened rows as CSV.
///
/// The header is the union of all row keys in first-seen order; a row
/// missing a column gets an empty cell. Nothing is written for zero rows.
pub fn write_csv<W: Write>(rows: &[FlatRow], writer: W) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !headers.contains(&key.as_str()) {
                headers.push(key.as_str());
            }
        }
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&headers).map_err(csv_error)?;
    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(cell_text).unwrap_or_default())
            .collect();
        csv_writer.write_record(&record).map_err(csv_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write `value` verbatim as pretty-printed JSON.
pub fn write_json<T: Serialize, W: Write>(value: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// `"<prefix>-<YYYY-MM-DD>.<extension>"`
pub fn export_file_name(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{}-{}.{}", prefix, date.format("%Y-%m-%d"), extension)
}

fn csv_error(err: csv::Error) -> InsightsError {
    InsightsError::Export(err.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
