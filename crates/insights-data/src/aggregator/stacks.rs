//! Per-stack reports: activity and per-author metrics.

use insights_core::calculations::MetricsCalculator;
use insights_core::data_processors::MetadataExtractor;
use insights_core::models::{EventRecord, EventTime, OrderedSet};
use insights_core::time_utils::AnalysisClock;
use serde::Serialize;
use tracing::debug;

use super::{bump, sort_desc_by_key, EventCounter, Groups};

// ── Stack activity ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackActivity {
    pub stack: String,
    pub total_events: u64,
    pub unique_users: usize,
    /// From `metadata.content_type.uid` only.
    pub content_types: OrderedSet,
    pub locales: OrderedSet,
    pub event_types: EventCounter,
    pub users: OrderedSet,
    pub last_activity: EventTime,
}

pub fn analyze_stack_activity(records: &[EventRecord]) -> Vec<StackActivity> {
    let mut stacks: Groups<&str, StackActivity> = Groups::new();

    for record in records {
        let raw = &record.raw;
        if raw.stack.is_empty() {
            continue;
        }

        let stack = stacks.entry(raw.stack.as_str(), || StackActivity {
            stack: raw.stack.clone(),
            total_events: 0,
            unique_users: 0,
            content_types: OrderedSet::new(),
            locales: OrderedSet::new(),
            event_types: EventCounter::new(),
            users: OrderedSet::new(),
            last_activity: record.timestamp,
        });
        stack.total_events += 1;
        stack.last_activity = stack.last_activity.max(record.timestamp);
        bump(&mut stack.event_types, &raw.event);
        if !raw.created_by.is_empty() {
            stack.users.insert(&raw.created_by);
        }
        if let Some(content_type) = MetadataExtractor::content_type_uid(record) {
            stack.content_types.insert(&content_type);
        }
        if let Some(locale) = MetadataExtractor::locale_code(record) {
            stack.locales.insert(&locale);
        }
        stack.unique_users = stack.users.len();
    }

    debug!("Stack activity: {} stacks", stacks.len());
    let mut result = stacks.into_vec();
    sort_desc_by_key(&mut result, |s| s.total_events);
    result
}

// ── Stack × user metrics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackUserDetail {
    pub user: String,
    pub total_items: u64,
    pub last_activity: EventTime,
    pub is_active_30_days: bool,
    pub is_active_90_days: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackUserMetrics {
    pub stack: String,
    pub total_users: usize,
    pub active_users_30_days: usize,
    pub active_users_90_days: usize,
    pub avg_items_per_author: f64,
    /// Most items first.
    pub user_details: Vec<StackUserDetail>,
}

struct StackUsers<'a> {
    stack: &'a str,
    users: Groups<&'a str, (&'a str, u64, EventTime)>,
}

/// Per-author item counts and activity within each stack.
///
/// Stacks are ordered by distinct author count, largest first. Records
/// missing either a stack or an author are skipped.
pub fn analyze_stack_user_metrics(
    records: &[EventRecord],
    clock: &AnalysisClock,
) -> Vec<StackUserMetrics> {
    let mut stacks: Groups<&str, StackUsers> = Groups::new();

    for record in records {
        let raw = &record.raw;
        if raw.stack.is_empty() || raw.created_by.is_empty() {
            continue;
        }

        let stack = stacks.entry(raw.stack.as_str(), || StackUsers {
            stack: raw.stack.as_str(),
            users: Groups::new(),
        });
        let (_, items, last) = stack.users.entry(raw.created_by.as_str(), || {
            (raw.created_by.as_str(), 0, record.timestamp)
        });
        *items += 1;
        *last = (*last).max(record.timestamp);
    }

    debug!("Stack user metrics: {} stacks", stacks.len());
    let mut result: Vec<StackUserMetrics> = stacks
        .into_vec()
        .into_iter()
        .map(|stack| {
            let mut user_details: Vec<StackUserDetail> = stack
                .users
                .into_vec()
                .into_iter()
                .map(|(user, total_items, last_activity)| StackUserDetail {
                    user: user.to_string(),
                    total_items,
                    last_activity,
                    is_active_30_days: clock.active_in_last_30_days(&last_activity),
                    is_active_90_days: clock.active_in_last_90_days(&last_activity),
                })
                .collect();
            sort_desc_by_key(&mut user_details, |u| u.total_items);

            let total_users = user_details.len();
            let total_items: u64 = user_details.iter().map(|u| u.total_items).sum();
            StackUserMetrics {
                stack: stack.stack.to_string(),
                total_users,
                active_users_30_days: user_details.iter().filter(|u| u.is_active_30_days).count(),
                active_users_90_days: user_details.iter().filter(|u| u.is_active_90_days).count(),
                avg_items_per_author: MetricsCalculator::avg_items_per_author(
                    total_items,
                    total_users,
                ),
                user_details,
            }
        })
        .collect();
    sort_desc_by_key(&mut result, |s| s.total_users);
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
