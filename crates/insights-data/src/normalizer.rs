//! Raw CSV row → [`EventRecord`] conversion.

use insights_core::data_processors::EmbeddedJson;
use insights_core::models::{EventRecord, EventTime, RawRecord};
use tracing::debug;

// ── NormalizeStats ────────────────────────────────────────────────────────────

/// Counters gathered while normalizing one batch of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows_read: usize,
    /// Rows removed because `created_at` was empty.
    pub rows_dropped: usize,
    /// Kept rows whose `created_at` could not be parsed.
    pub invalid_timestamps: usize,
    /// Non-blank embedded JSON columns that failed to decode.
    pub json_fields_failed: usize,
}

impl NormalizeStats {
    pub fn merge(&mut self, other: &NormalizeStats) {
        self.rows_read += other.rows_read;
        self.rows_dropped += other.rows_dropped;
        self.invalid_timestamps += other.invalid_timestamps;
        self.json_fields_failed += other.json_fields_failed;
    }
}

// ── Normalization ─────────────────────────────────────────────────────────────

/// Normalize one row. Returns `None` when `created_at` is empty.
pub fn normalize_record(raw: RawRecord) -> Option<EventRecord> {
    if raw.created_at.is_empty() {
        return None;
    }

    let timestamp = EventTime::parse(&raw.created_at);
    Some(EventRecord {
        parsed_metadata: EmbeddedJson::parse(&raw.metadata),
        parsed_payload: EmbeddedJson::parse(&raw.payload),
        parsed_request: EmbeddedJson::parse(&raw.request),
        parsed_response: EmbeddedJson::parse(&raw.response),
        timestamp,
        raw,
    })
}

/// Normalize a batch, keeping input order.
pub fn normalize_batch(rows: Vec<RawRecord>) -> (Vec<EventRecord>, NormalizeStats) {
    let mut stats = NormalizeStats {
        rows_read: rows.len(),
        ..Default::default()
    };

    let mut records = Vec::with_capacity(rows.len());
    for raw in rows {
        let failed = failed_json_fields(&raw);
        match normalize_record(raw) {
            Some(record) => {
                if !record.timestamp.is_valid() {
                    stats.invalid_timestamps += 1;
                }
                stats.json_fields_failed += failed;
                records.push(record);
            }
            None => stats.rows_dropped += 1,
        }
    }

    debug!(
        "Normalized {} of {} rows ({} dropped, {} invalid timestamps, {} JSON fields failed)",
        records.len(),
        stats.rows_read,
        stats.rows_dropped,
        stats.invalid_timestamps,
        stats.json_fields_failed
    );

    (records, stats)
}

/// Embedded JSON columns holding text that is neither blank, `null`, nor valid JSON.
fn failed_json_fields(raw: &RawRecord) -> usize {
    [&raw.metadata, &raw.payload, &raw.request, &raw.response]
        .into_iter()
        .filter(|text| {
            let trimmed = text.trim();
            !trimmed.is_empty() && trimmed != "null" && EmbeddedJson::parse(trimmed).is_none()
        })
        .count()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(created_at: &str, created_by: &str) -> RawRecord {
        RawRecord {
            created_at: created_at.to_string(),
            created_by: created_by.to_string(),
            ..Default::default()
        }
    }

    // ── normalize_record ─────────────────────────────────────────────────────

    #[test]
    fn test_normalize_parses_json_fields() {
        let row = RawRecord {
            metadata: r#"{"uid":"entry_1","locale":{"code":"en-us"}}"#.to_string(),
            payload: "null".to_string(),
            request: "{not json".to_string(),
            response: String::new(),
            ..raw("2024-01-15T10:00:00Z", "alice")
        };

        let record = normalize_record(row).unwrap();
        assert_eq!(
            record.parsed_metadata,
            Some(json!({"uid": "entry_1", "locale": {"code": "en-us"}}))
        );
        assert!(record.parsed_payload.is_none());
        assert!(record.parsed_request.is_none());
        assert!(record.parsed_response.is_none());
        assert_eq!(record.raw.request, "{not json");
        assert!(record.timestamp.is_valid());
    }

    #[test]
    fn test_normalize_drops_missing_created_at() {
        assert!(normalize_record(raw("", "alice")).is_none());
    }

    #[test]
    fn test_normalize_keeps_whitespace_created_at_as_invalid() {
        let record = normalize_record(raw("   ", "alice")).unwrap();
        assert_eq!(record.timestamp, EventTime::Invalid);
        assert_eq!(record.raw.created_by, "alice");
    }

    #[test]
    fn test_normalize_keeps_malformed_timestamp() {
        let record = normalize_record(raw("sometime last week", "alice")).unwrap();
        assert_eq!(record.timestamp, EventTime::Invalid);
        assert_eq!(record.raw.created_at, "sometime last week");
    }

    // ── normalize_batch ──────────────────────────────────────────────────────

    #[test]
    fn test_normalize_batch_preserves_order_and_counts() {
        let mut broken = raw("2024-01-03T00:00:00Z", "carol");
        broken.metadata = "{oops".to_string();
        let rows = vec![
            raw("2024-01-01T00:00:00Z", "alice"),
            raw("", "ghost"),
            raw("garbage", "bob"),
            broken,
        ];

        let (records, stats) = normalize_batch(rows);
        let users: Vec<&str> = records.iter().map(|r| r.raw.created_by.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
        assert_eq!(
            stats,
            NormalizeStats {
                rows_read: 4,
                rows_dropped: 1,
                invalid_timestamps: 1,
                json_fields_failed: 1,
            }
        );
    }

    #[test]
    fn test_normalize_batch_empty() {
        let (records, stats) = normalize_batch(Vec::new());
        assert!(records.is_empty());
        assert_eq!(stats, NormalizeStats::default());
    }

    #[test]
    fn test_stats_merge() {
        let mut total = NormalizeStats {
            rows_read: 2,
            rows_dropped: 1,
            ..Default::default()
        };
        total.merge(&NormalizeStats {
            rows_read: 3,
            invalid_timestamps: 2,
            ..Default::default()
        });
        assert_eq!(total.rows_read, 5);
        assert_eq!(total.rows_dropped, 1);
        assert_eq!(total.invalid_timestamps, 2);
    }
}
