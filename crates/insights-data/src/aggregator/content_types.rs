//! Content-type reports: activity, publishing and locale adoption.
//!
//! Activity resolves the content type through the full chain in
//! [`ContentTypeResolver::resolve`]. Publishing and adoption only look at
//! `metadata.content_type`, so module-level fallbacks never show up there.

use std::collections::HashSet;

use insights_core::calculations::MetricsCalculator;
use insights_core::data_processors::{ContentTypeResolver, MetadataExtractor};
use insights_core::models::{EventRecord, EventTime, OrderedSet};
use insights_core::time_utils::AnalysisClock;
use serde::Serialize;
use tracing::debug;

use super::{bump, sort_desc_by_key, EventCounter, Groups};

const TOP_PUBLISHERS: usize = 5;

fn is_publish_family(event: &str) -> bool {
    matches!(event, "publish" | "unpublish")
}

// ── Content type activity ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeActivity {
    pub content_type: String,
    pub total_events: u64,
    pub operations: EventCounter,
    pub users: OrderedSet,
    pub stacks: OrderedSet,
    pub locales: OrderedSet,
    pub last_used: EventTime,
    pub used_in_last_30_days: bool,
    pub used_in_last_90_days: bool,
}

pub fn analyze_content_type_activity(
    records: &[EventRecord],
    clock: &AnalysisClock,
) -> Vec<ContentTypeActivity> {
    let mut content_types: Groups<String, ContentTypeActivity> = Groups::new();

    for record in records {
        let Some(key) = ContentTypeResolver::resolve(record) else {
            continue;
        };
        let raw = &record.raw;

        let ct = content_types.entry(key.clone(), || ContentTypeActivity {
            content_type: key.clone(),
            total_events: 0,
            operations: EventCounter::new(),
            users: OrderedSet::new(),
            stacks: OrderedSet::new(),
            locales: OrderedSet::new(),
            last_used: record.timestamp,
            used_in_last_30_days: false,
            used_in_last_90_days: false,
        });
        ct.total_events += 1;
        ct.last_used = ct.last_used.max(record.timestamp);
        ct.used_in_last_30_days |= clock.active_in_last_30_days(&record.timestamp);
        ct.used_in_last_90_days |= clock.active_in_last_90_days(&record.timestamp);
        bump(&mut ct.operations, &raw.event);
        if !raw.created_by.is_empty() {
            ct.users.insert(&raw.created_by);
        }
        if !raw.stack.is_empty() {
            ct.stacks.insert(&raw.stack);
        }
        if let Some(locale) = MetadataExtractor::locale_code(record) {
            ct.locales.insert(&locale);
        }
    }

    debug!("Content type activity: {} content types", content_types.len());
    let mut result = content_types.into_vec();
    sort_desc_by_key(&mut result, |c| c.total_events);
    result
}

// ── Publish metrics ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPeriods {
    pub last_30_days: u64,
    pub last_90_days: u64,
    pub all_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublisherCount {
    pub user: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishMetrics {
    pub content_type: String,
    /// `publish` plus `unpublish` events.
    pub total_publishes: u64,
    /// Distinct `metadata.uid` values across all events.
    pub total_entries: usize,
    pub publish_ratio: f64,
    pub publishes_by_period: PublishPeriods,
    pub by_locale: EventCounter,
    pub by_stack: EventCounter,
    pub top_publishers: Vec<PublisherCount>,
}

struct PublishAccumulator<'a> {
    content_type: String,
    entries: HashSet<String>,
    periods: PublishPeriods,
    by_locale: EventCounter,
    by_stack: EventCounter,
    publishers: Groups<&'a str, PublisherCount>,
}

/// Publishing volume per content type, most publishes first.
pub fn analyze_publish_metrics(
    records: &[EventRecord],
    clock: &AnalysisClock,
) -> Vec<PublishMetrics> {
    let mut content_types: Groups<String, PublishAccumulator> = Groups::new();

    for record in records {
        let Some(key) = ContentTypeResolver::from_metadata(record) else {
            continue;
        };
        let raw = &record.raw;

        let acc = content_types.entry(key.clone(), || PublishAccumulator {
            content_type: key.clone(),
            entries: HashSet::new(),
            periods: PublishPeriods::default(),
            by_locale: EventCounter::new(),
            by_stack: EventCounter::new(),
            publishers: Groups::new(),
        });

        if let Some(uid) = MetadataExtractor::entry_uid(record) {
            acc.entries.insert(uid);
        }

        if !is_publish_family(&raw.event) {
            continue;
        }
        acc.periods.all_time += 1;
        if clock.active_in_last_30_days(&record.timestamp) {
            acc.periods.last_30_days += 1;
        }
        if clock.active_in_last_90_days(&record.timestamp) {
            acc.periods.last_90_days += 1;
        }
        if let Some(locale) = MetadataExtractor::locale_code(record) {
            bump(&mut acc.by_locale, &locale);
        }
        if !raw.stack.is_empty() {
            bump(&mut acc.by_stack, &raw.stack);
        }
        if !raw.created_by.is_empty() {
            acc.publishers
                .entry(raw.created_by.as_str(), || PublisherCount {
                    user: raw.created_by.clone(),
                    count: 0,
                })
                .count += 1;
        }
    }

    debug!("Publish metrics: {} content types", content_types.len());
    let mut result: Vec<PublishMetrics> = content_types
        .into_vec()
        .into_iter()
        .map(|acc| {
            let mut top_publishers = acc.publishers.into_vec();
            sort_desc_by_key(&mut top_publishers, |p| p.count);
            top_publishers.truncate(TOP_PUBLISHERS);

            let total_publishes = acc.periods.all_time;
            PublishMetrics {
                content_type: acc.content_type,
                total_publishes,
                total_entries: acc.entries.len(),
                publish_ratio: MetricsCalculator::publish_ratio(total_publishes, acc.entries.len()),
                publishes_by_period: acc.periods,
                by_locale: acc.by_locale,
                by_stack: acc.by_stack,
                top_publishers,
            }
        })
        .collect();
    sort_desc_by_key(&mut result, |p| p.total_publishes);
    result
}

// ── Content type × locale adoption ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeLocaleAdoption {
    pub content_type: String,
    pub locale: String,
    pub locale_name: String,
    pub total_entries: usize,
    /// Distinct entries with at least one `publish` event.
    pub published_entries: usize,
    pub last_activity: EventTime,
    pub active_users: OrderedSet,
    pub adoption_score: f64,
}

struct AdoptionAccumulator {
    content_type: String,
    locale: String,
    locale_name: String,
    entries: HashSet<String>,
    published: HashSet<String>,
    last_activity: EventTime,
    users: OrderedSet,
}

/// How broadly each content type is used per locale, best adopted first.
pub fn analyze_content_type_locale_adoption(
    records: &[EventRecord],
) -> Vec<ContentTypeLocaleAdoption> {
    let mut pairs: Groups<(String, String), AdoptionAccumulator> = Groups::new();

    for record in records {
        let (Some(content_type), Some(locale)) = (
            ContentTypeResolver::from_metadata(record),
            MetadataExtractor::locale_code(record),
        ) else {
            continue;
        };
        let raw = &record.raw;

        let acc = pairs.entry((content_type.clone(), locale.clone()), || {
            AdoptionAccumulator {
                locale_name: MetadataExtractor::locale_name(record)
                    .unwrap_or_else(|| locale.clone()),
                content_type: content_type.clone(),
                locale: locale.clone(),
                entries: HashSet::new(),
                published: HashSet::new(),
                last_activity: record.timestamp,
                users: OrderedSet::new(),
            }
        });

        if let Some(uid) = MetadataExtractor::entry_uid(record) {
            if raw.event == "publish" {
                acc.published.insert(uid.clone());
            }
            acc.entries.insert(uid);
        }
        acc.last_activity = acc.last_activity.max(record.timestamp);
        if !raw.created_by.is_empty() {
            acc.users.insert(&raw.created_by);
        }
    }

    debug!("Content type locale adoption: {} pairs", pairs.len());
    let mut result: Vec<ContentTypeLocaleAdoption> = pairs
        .into_vec()
        .into_iter()
        .map(|acc| ContentTypeLocaleAdoption {
            adoption_score: MetricsCalculator::adoption_score(
                acc.entries.len(),
                acc.users.len(),
                acc.published.len(),
            ),
            content_type: acc.content_type,
            locale: acc.locale,
            locale_name: acc.locale_name,
            total_entries: acc.entries.len(),
            published_entries: acc.published.len(),
            last_activity: acc.last_activity,
            active_users: acc.users,
        })
        .collect();
    result.sort_by(|a, b| b.adoption_score.total_cmp(&a.adoption_score));
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
