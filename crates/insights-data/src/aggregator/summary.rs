//! Whole-dataset summary.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use insights_core::calculations::MetricsCalculator;
use insights_core::data_processors::MetadataExtractor;
use insights_core::models::{EventRecord, EventTime};
use insights_core::time_utils::AnalysisClock;
use serde::Serialize;
use tracing::debug;

use super::{bump, sort_desc_by_key, EventCounter, Groups};

const TOP_USERS: usize = 20;
const TOP_STACKS: usize = 10;
const RECENT_ACTIVITY: usize = 50;

// ── Report types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub user: String,
    pub count: u64,
    pub last_activity: EventTime,
    pub active_in_last_90_days: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStack {
    pub stack: String,
    pub count: u64,
    pub unique_users: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivitySummary {
    pub total_users: usize,
    pub active_in_last_30_days: usize,
    pub active_in_last_90_days: usize,
    pub never_active: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTypeUsageSummary {
    pub total_content_types: usize,
    pub used_in_last_30_days: usize,
    pub used_in_last_90_days: usize,
    pub never_used: usize,
}

/// Share of all distinct users that touched one stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackUsageRatio {
    pub users: usize,
    pub total_users: usize,
    pub percentage: f64,
}

/// Dataset-wide counters, histograms, rankings and activity summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_events: usize,
    pub unique_users: usize,
    pub unique_stacks: usize,
    /// Every record counts, an empty event under `""`.
    pub events_by_type: EventCounter,
    pub events_by_module: EventCounter,
    pub events_by_user: EventCounter,
    pub events_by_stack: EventCounter,
    pub events_by_locale: EventCounter,
    /// Ascending by date. Records with an invalid timestamp are not bucketed.
    pub events_by_day: Vec<DayBucket>,
    /// Always 24 buckets, hour 0 first.
    pub events_by_hour: Vec<HourBucket>,
    pub top_users: Vec<TopUser>,
    pub top_stacks: Vec<TopStack>,
    pub recent_activity: Vec<EventRecord>,
    pub user_activity_summary: UserActivitySummary,
    pub content_type_usage_summary: ContentTypeUsageSummary,
    pub stack_usage_ratio: BTreeMap<String, StackUsageRatio>,
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Summarize the whole dataset.
pub fn analyze_audit_logs(records: &[EventRecord], clock: &AnalysisClock) -> AnalyticsSummary {
    let mut events_by_type = EventCounter::new();
    let mut events_by_module = EventCounter::new();
    let mut events_by_user = EventCounter::new();
    let mut events_by_stack = EventCounter::new();
    let mut events_by_locale = EventCounter::new();
    let mut events_by_day: BTreeMap<String, u64> = BTreeMap::new();
    let mut events_by_hour = [0u64; 24];

    let mut users: Groups<&str, TopUser> = Groups::new();
    let mut stacks: Groups<&str, TopStack> = Groups::new();
    let mut content_type_last_used: HashMap<String, EventTime> = HashMap::new();
    let mut stack_users: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();

    for record in records {
        let raw = &record.raw;
        bump(&mut events_by_type, &raw.event);

        if !raw.module.is_empty() {
            bump(&mut events_by_module, &raw.module);
        }

        if !raw.created_by.is_empty() {
            bump(&mut events_by_user, &raw.created_by);
            let user = users.entry(raw.created_by.as_str(), || TopUser {
                user: raw.created_by.clone(),
                count: 0,
                last_activity: record.timestamp,
                active_in_last_90_days: false,
            });
            user.count += 1;
            user.last_activity = user.last_activity.max(record.timestamp);
        }

        if !raw.stack.is_empty() {
            bump(&mut events_by_stack, &raw.stack);
            stacks
                .entry(raw.stack.as_str(), || TopStack {
                    stack: raw.stack.clone(),
                    count: 0,
                    unique_users: 0,
                })
                .count += 1;
            if !raw.created_by.is_empty() {
                stack_users
                    .entry(raw.stack.as_str())
                    .or_default()
                    .insert(raw.created_by.as_str());
            }
        }

        if let Some(locale) = MetadataExtractor::locale_code(record) {
            bump(&mut events_by_locale, &locale);
        }

        if let Some(content_type) = MetadataExtractor::content_type_uid(record) {
            let last = content_type_last_used
                .entry(content_type)
                .or_insert(record.timestamp);
            *last = (*last).max(record.timestamp);
        }

        if let Some(day) = clock.day_key(&record.timestamp) {
            *events_by_day.entry(day).or_insert(0) += 1;
        }
        if let Some(hour) = clock.hour_of_day(&record.timestamp) {
            events_by_hour[hour as usize] += 1;
        }
    }

    let unique_users = users.len();
    let unique_stacks = stacks.len();

    let mut top_users = users.into_vec();
    let users_30 = count_after(
        top_users.iter().map(|u| &u.last_activity),
        clock.thirty_days_ago(),
    );
    let users_90 = count_after(
        top_users.iter().map(|u| &u.last_activity),
        clock.ninety_days_ago(),
    );
    let content_types_30 = count_after(content_type_last_used.values(), clock.thirty_days_ago());
    let content_types_90 = count_after(content_type_last_used.values(), clock.ninety_days_ago());

    for user in &mut top_users {
        user.active_in_last_90_days = clock.active_in_last_90_days(&user.last_activity);
    }
    sort_desc_by_key(&mut top_users, |u| u.count);
    top_users.truncate(TOP_USERS);

    let mut top_stacks = stacks.into_vec();
    for stack in &mut top_stacks {
        stack.unique_users = stack_users.get(stack.stack.as_str()).map_or(0, HashSet::len);
    }
    sort_desc_by_key(&mut top_stacks, |s| s.count);
    top_stacks.truncate(TOP_STACKS);

    let stack_usage_ratio = stack_users
        .iter()
        .map(|(stack, users)| {
            let ratio = StackUsageRatio {
                users: users.len(),
                total_users: unique_users,
                percentage: MetricsCalculator::usage_percentage(users.len(), unique_users),
            };
            (stack.to_string(), ratio)
        })
        .collect();

    let mut recent: Vec<&EventRecord> = records.iter().collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let recent_activity = recent
        .into_iter()
        .take(RECENT_ACTIVITY)
        .cloned()
        .collect();

    debug!(
        "Summary: {} events, {} users, {} stacks, {} days",
        records.len(),
        unique_users,
        unique_stacks,
        events_by_day.len()
    );

    AnalyticsSummary {
        total_events: records.len(),
        unique_users,
        unique_stacks,
        events_by_type,
        events_by_module,
        events_by_user,
        events_by_stack,
        events_by_locale,
        events_by_day: events_by_day
            .into_iter()
            .map(|(date, count)| DayBucket { date, count })
            .collect(),
        events_by_hour: (0u32..)
            .zip(events_by_hour)
            .map(|(hour, count)| HourBucket { hour, count })
            .collect(),
        top_users,
        top_stacks,
        recent_activity,
        user_activity_summary: UserActivitySummary {
            total_users: unique_users,
            active_in_last_30_days: users_30,
            active_in_last_90_days: users_90,
            never_active: unique_users - users_90,
        },
        content_type_usage_summary: ContentTypeUsageSummary {
            total_content_types: content_type_last_used.len(),
            used_in_last_30_days: content_types_30,
            used_in_last_90_days: content_types_90,
            never_used: content_type_last_used.len().saturating_sub(content_types_90),
        },
        stack_usage_ratio,
    }
}

fn count_after<'a>(times: impl Iterator<Item = &'a EventTime>, anchor: DateTime<Utc>) -> usize {
    times.filter(|ts| ts.is_after(anchor)).count()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
