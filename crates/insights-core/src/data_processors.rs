use serde_json::Value;

use crate::models::{EventRecord, RawRecord};

/// Label used for entry events that carry no content type of their own.
pub const ENTRY_OPERATIONS: &str = "Entry Operations";
/// Label used for asset events that carry no content type of their own.
pub const ASSET_OPERATIONS: &str = "Asset Operations";

// ── EmbeddedJson ──────────────────────────────────────────────────────────────

/// Decodes the JSON text stored in the `metadata`, `payload`, `request` and
/// `response` columns.
pub struct EmbeddedJson;

impl EmbeddedJson {
    /// Best-effort parse of one embedded JSON column.
    ///
    /// Returns `None` for blank text, the literal `null`, or text that is not
    /// valid JSON.
    pub fn parse(text: &str) -> Option<Value> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}

// ── Key extraction ────────────────────────────────────────────────────────────

/// Turn a JSON scalar into a grouping key.
///
/// Non-empty strings are used verbatim and numbers are stringified; every
/// other shape yields `None`.
pub fn json_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Follow `path` through nested objects and return the key found there.
fn lookup_key(root: Option<&Value>, path: &[&str]) -> Option<String> {
    let mut current = root?;
    for segment in path {
        current = current.get(segment)?;
    }
    json_key(current)
}

// ── MetadataExtractor ─────────────────────────────────────────────────────────

/// Reads the well-known fields of a record's decoded `metadata` column.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// `metadata.content_type.uid`
    pub fn content_type_uid(record: &EventRecord) -> Option<String> {
        lookup_key(record.parsed_metadata.as_ref(), &["content_type", "uid"])
    }

    /// `metadata.content_type.title`
    pub fn content_type_title(record: &EventRecord) -> Option<String> {
        lookup_key(record.parsed_metadata.as_ref(), &["content_type", "title"])
    }

    /// `metadata.locale.code`
    pub fn locale_code(record: &EventRecord) -> Option<String> {
        lookup_key(record.parsed_metadata.as_ref(), &["locale", "code"])
    }

    /// `metadata.locale.name`
    pub fn locale_name(record: &EventRecord) -> Option<String> {
        lookup_key(record.parsed_metadata.as_ref(), &["locale", "name"])
    }

    /// `metadata.uid`, the identifier of the entry the event touched.
    pub fn entry_uid(record: &EventRecord) -> Option<String> {
        lookup_key(record.parsed_metadata.as_ref(), &["uid"])
    }
}

// ── ContentTypeResolver ───────────────────────────────────────────────────────

/// Derives the content type an event belongs to.
pub struct ContentTypeResolver;

impl ContentTypeResolver {
    /// Metadata-only resolution: `content_type.uid`, then `content_type.title`.
    pub fn from_metadata(record: &EventRecord) -> Option<String> {
        MetadataExtractor::content_type_uid(record)
            .or_else(|| MetadataExtractor::content_type_title(record))
    }

    /// Full resolution chain.
    ///
    /// 1. `metadata.content_type.uid`
    /// 2. `metadata.content_type.title`
    /// 3. `payload.content_type`
    /// 4. `module == "entry"` → [`ENTRY_OPERATIONS`],
    ///    `module == "asset"` → [`ASSET_OPERATIONS`], only for a non-empty `event`
    pub fn resolve(record: &EventRecord) -> Option<String> {
        Self::from_metadata(record)
            .or_else(|| lookup_key(record.parsed_payload.as_ref(), &["content_type"]))
            .or_else(|| Self::module_label(&record.raw))
    }

    fn module_label(raw: &RawRecord) -> Option<String> {
        if raw.event.is_empty() {
            return None;
        }
        match raw.module.as_str() {
            "entry" => Some(ENTRY_OPERATIONS.to_string()),
            "asset" => Some(ASSET_OPERATIONS.to_string()),
            _ => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventTime, RawRecord};
    use serde_json::json;

    fn record(module: &str, metadata: Option<Value>, payload: Option<Value>) -> EventRecord {
        EventRecord {
            raw: RawRecord {
                module: module.to_string(),
                event: "update".to_string(),
                created_at: "2024-01-15T10:00:00Z".to_string(),
                ..Default::default()
            },
            parsed_metadata: metadata,
            parsed_payload: payload,
            parsed_request: None,
            parsed_response: None,
            timestamp: EventTime::parse("2024-01-15T10:00:00Z"),
        }
    }

    // ── EmbeddedJson ─────────────────────────────────────────────────────────

    #[test]
    fn test_embedded_json_valid() {
        assert_eq!(EmbeddedJson::parse(r#"{"a":1}"#), Some(json!({"a": 1})));
    }

    #[test]
    fn test_embedded_json_blank_null_and_invalid() {
        assert!(EmbeddedJson::parse("").is_none());
        assert!(EmbeddedJson::parse("   ").is_none());
        assert!(EmbeddedJson::parse("null").is_none());
        assert!(EmbeddedJson::parse("{broken").is_none());
    }

    #[test]
    fn test_embedded_json_surrounding_whitespace() {
        assert_eq!(EmbeddedJson::parse("  [1, 2] "), Some(json!([1, 2])));
    }

    // ── json_key ─────────────────────────────────────────────────────────────

    #[test]
    fn test_json_key_shapes() {
        assert_eq!(json_key(&json!("blog")), Some("blog".to_string()));
        assert_eq!(json_key(&json!(42)), Some("42".to_string()));
        assert!(json_key(&json!("")).is_none());
        assert!(json_key(&json!(null)).is_none());
        assert!(json_key(&json!({"uid": "x"})).is_none());
    }

    // ── MetadataExtractor ────────────────────────────────────────────────────

    #[test]
    fn test_locale_and_entry_uid() {
        let r = record(
            "entry",
            Some(json!({"uid": "e1", "locale": {"code": "en-us", "name": "English"}})),
            None,
        );
        assert_eq!(MetadataExtractor::locale_code(&r).as_deref(), Some("en-us"));
        assert_eq!(MetadataExtractor::locale_name(&r).as_deref(), Some("English"));
        assert_eq!(MetadataExtractor::entry_uid(&r).as_deref(), Some("e1"));
    }

    #[test]
    fn test_missing_metadata_yields_none() {
        let r = record("entry", None, None);
        assert!(MetadataExtractor::locale_code(&r).is_none());
        assert!(MetadataExtractor::entry_uid(&r).is_none());
    }

    // ── ContentTypeResolver ──────────────────────────────────────────────────

    #[test]
    fn test_resolve_prefers_uid() {
        let r = record(
            "entry",
            Some(json!({"content_type": {"uid": "blog", "title": "Blog"}})),
            Some(json!({"content_type": "page"})),
        );
        assert_eq!(ContentTypeResolver::resolve(&r).as_deref(), Some("blog"));
    }

    #[test]
    fn test_resolve_falls_back_to_title_then_payload() {
        let titled = record("", Some(json!({"content_type": {"title": "Blog"}})), None);
        assert_eq!(ContentTypeResolver::resolve(&titled).as_deref(), Some("Blog"));

        let payload = record("", Some(json!({})), Some(json!({"content_type": "page"})));
        assert_eq!(ContentTypeResolver::resolve(&payload).as_deref(), Some("page"));
    }

    #[test]
    fn test_resolve_module_labels() {
        let entry = record("entry", None, None);
        assert_eq!(
            ContentTypeResolver::resolve(&entry).as_deref(),
            Some(ENTRY_OPERATIONS)
        );
        let asset = record("asset", None, None);
        assert_eq!(
            ContentTypeResolver::resolve(&asset).as_deref(),
            Some(ASSET_OPERATIONS)
        );
    }

    #[test]
    fn test_resolve_module_label_needs_event() {
        let mut r = record("entry", None, None);
        r.raw.event.clear();
        assert!(ContentTypeResolver::resolve(&r).is_none());
    }

    #[test]
    fn test_resolve_unresolved() {
        let r = record("stack", None, None);
        assert!(ContentTypeResolver::resolve(&r).is_none());
    }

    #[test]
    fn test_from_metadata_ignores_payload_and_module() {
        let r = record("entry", None, Some(json!({"content_type": "page"})));
        assert!(ContentTypeResolver::from_metadata(&r).is_none());
    }
}
