//! Locale activity, keyed on `metadata.locale.code`.

use insights_core::data_processors::MetadataExtractor;
use insights_core::models::{EventRecord, OrderedSet};
use serde::Serialize;
use tracing::debug;

use super::{bump, sort_desc_by_key, EventCounter, Groups};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleActivity {
    pub locale: String,
    /// `locale.name` of the first record seen, else the code.
    pub locale_name: String,
    pub total_events: u64,
    pub unique_users: usize,
    /// From `metadata.content_type.uid` only.
    pub content_types: OrderedSet,
    pub stacks: OrderedSet,
    pub event_types: EventCounter,
    pub users: OrderedSet,
}

pub fn analyze_locale_activity(records: &[EventRecord]) -> Vec<LocaleActivity> {
    let mut locales: Groups<String, LocaleActivity> = Groups::new();

    for record in records {
        let Some(code) = MetadataExtractor::locale_code(record) else {
            continue;
        };
        let raw = &record.raw;

        let locale = locales.entry(code.clone(), || LocaleActivity {
            locale_name: MetadataExtractor::locale_name(record).unwrap_or_else(|| code.clone()),
            locale: code.clone(),
            total_events: 0,
            unique_users: 0,
            content_types: OrderedSet::new(),
            stacks: OrderedSet::new(),
            event_types: EventCounter::new(),
            users: OrderedSet::new(),
        });
        locale.total_events += 1;
        bump(&mut locale.event_types, &raw.event);
        if !raw.created_by.is_empty() {
            locale.users.insert(&raw.created_by);
        }
        if let Some(content_type) = MetadataExtractor::content_type_uid(record) {
            locale.content_types.insert(&content_type);
        }
        if !raw.stack.is_empty() {
            locale.stacks.insert(&raw.stack);
        }
        locale.unique_users = locale.users.len();
    }

    debug!("Locale activity: {} locales", locales.len());
    let mut result = locales.into_vec();
    sort_desc_by_key(&mut result, |l| l.total_events);
    result
}
