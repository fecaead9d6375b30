use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{HashMap, HashSet};

use crate::time_utils::TimestampParser;

/// Column names of an audit-log CSV export, in export order.
pub const RAW_COLUMNS: &[&str] = &[
    "app_type",
    "branch",
    "channels",
    "created_at",
    "created_by",
    "event",
    "headers",
    "launch_deployment_uid",
    "launch_environment_uid",
    "launch_project_uid",
    "management_token_uid",
    "metadata",
    "module",
    "module_uid",
    "org_uid",
    "payload",
    "project_uid",
    "remote_addr",
    "request",
    "request_id",
    "response",
    "sort",
    "stack",
    "uid",
    "vendor_uid",
];

/// One decoded CSV row before normalization.
///
/// Every column is a plain string; a column missing from the source row is
/// stored as `""`, never as an absent value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub app_type: String,
    pub branch: String,
    pub channels: String,
    pub created_at: String,
    pub created_by: String,
    pub event: String,
    pub headers: String,
    pub launch_deployment_uid: String,
    pub launch_environment_uid: String,
    pub launch_project_uid: String,
    pub management_token_uid: String,
    /// Embedded JSON text.
    pub metadata: String,
    pub module: String,
    pub module_uid: String,
    pub org_uid: String,
    /// Embedded JSON text.
    pub payload: String,
    pub project_uid: String,
    pub remote_addr: String,
    /// Embedded JSON text.
    pub request: String,
    pub request_id: String,
    /// Embedded JSON text.
    pub response: String,
    pub sort: String,
    pub stack: String,
    pub uid: String,
    pub vendor_uid: String,
}

impl RawRecord {
    /// Build a record from a column-name → value mapping.
    ///
    /// Unknown columns are ignored and missing columns default to `""`.
    pub fn from_row(row: &HashMap<String, String>) -> Self {
        let field = |name: &str| row.get(name).cloned().unwrap_or_default();
        Self {
            app_type: field("app_type"),
            branch: field("branch"),
            channels: field("channels"),
            created_at: field("created_at"),
            created_by: field("created_by"),
            event: field("event"),
            headers: field("headers"),
            launch_deployment_uid: field("launch_deployment_uid"),
            launch_environment_uid: field("launch_environment_uid"),
            launch_project_uid: field("launch_project_uid"),
            management_token_uid: field("management_token_uid"),
            metadata: field("metadata"),
            module: field("module"),
            module_uid: field("module_uid"),
            org_uid: field("org_uid"),
            payload: field("payload"),
            project_uid: field("project_uid"),
            remote_addr: field("remote_addr"),
            request: field("request"),
            request_id: field("request_id"),
            response: field("response"),
            sort: field("sort"),
            stack: field("stack"),
            uid: field("uid"),
            vendor_uid: field("vendor_uid"),
        }
    }
}

// ── EventTime ─────────────────────────────────────────────────────────────────

/// Timestamp of an event record.
///
/// A `created_at` value that cannot be parsed is kept as [`EventTime::Invalid`]
/// instead of being rejected. `Invalid` orders before every valid instant, so
/// it never wins a "most recent" comparison, sorts last in recency lists and
/// is never inside an activity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventTime {
    Invalid,
    Valid(DateTime<Utc>),
}

impl EventTime {
    /// Parse a `created_at` string. Never fails.
    pub fn parse(s: &str) -> Self {
        match TimestampParser::parse(s) {
            Some(dt) => EventTime::Valid(dt),
            None => EventTime::Invalid,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Valid(dt) => Some(*dt),
            EventTime::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, EventTime::Valid(_))
    }

    /// Strictly later than `anchor`. Always `false` for invalid timestamps.
    pub fn is_after(&self, anchor: DateTime<Utc>) -> bool {
        match self {
            EventTime::Valid(dt) => *dt > anchor,
            EventTime::Invalid => false,
        }
    }

    /// ISO-8601 rendering with millisecond precision and a `Z` suffix.
    pub fn to_iso_string(&self) -> Option<String> {
        self.as_datetime()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(dt: DateTime<Utc>) -> Self {
        EventTime::Valid(dt)
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_iso_string() {
            Some(s) => serializer.serialize_str(&s),
            None => serializer.serialize_none(),
        }
    }
}

// ── EventRecord ───────────────────────────────────────────────────────────────

/// A normalized audit-log entry.
///
/// Carries every raw column plus the parsed timestamp and whichever embedded
/// JSON columns decoded successfully. Aggregators only ever read it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(flatten)]
    pub raw: RawRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_request: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_response: Option<serde_json::Value>,
    pub timestamp: EventTime,
}

// ── OrderedSet ────────────────────────────────────────────────────────────────

/// Distinct strings kept in first-insertion order.
///
/// Serializes as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` unless already present. Returns `true` when inserted.
    pub fn insert(&mut self, value: &str) -> bool {
        if self.seen.contains(value) {
            return false;
        }
        self.seen.insert(value.to_string());
        self.items.push(value.to_string());
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.seen.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

impl Serialize for OrderedSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'a> FromIterator<&'a str> for OrderedSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = OrderedSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}
