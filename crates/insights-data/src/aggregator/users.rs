//! Per-user reports: activity and engagement.

use insights_core::calculations::MetricsCalculator;
use insights_core::data_processors::MetadataExtractor;
use insights_core::models::{EventRecord, EventTime, OrderedSet};
use insights_core::time_utils::AnalysisClock;
use serde::Serialize;
use tracing::debug;

use super::{bump, sort_desc_by_key, EventCounter, Groups};

// ── User activity ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub user: String,
    pub total_events: u64,
    pub last_activity: EventTime,
    pub event_types: EventCounter,
    /// Distinct `org_uid` values, first-seen order.
    pub organizations: OrderedSet,
}

/// One row per `created_by`, busiest first.
pub fn analyze_user_activity(records: &[EventRecord]) -> Vec<UserActivity> {
    let mut users: Groups<&str, UserActivity> = Groups::new();

    for record in records {
        let raw = &record.raw;
        if raw.created_by.is_empty() {
            continue;
        }

        let user = users.entry(raw.created_by.as_str(), || UserActivity {
            user: raw.created_by.clone(),
            total_events: 0,
            last_activity: record.timestamp,
            event_types: EventCounter::new(),
            organizations: OrderedSet::new(),
        });
        user.total_events += 1;
        user.last_activity = user.last_activity.max(record.timestamp);
        bump(&mut user.event_types, &raw.event);
        if !raw.org_uid.is_empty() {
            user.organizations.insert(&raw.org_uid);
        }
    }

    debug!("User activity: {} users", users.len());
    let mut result = users.into_vec();
    sort_desc_by_key(&mut result, |u| u.total_events);
    result
}

// ── User engagement ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEngagement {
    pub user: String,
    pub total_events: u64,
    pub last_activity: EventTime,
    pub active_in_last_30_days: bool,
    pub active_in_last_90_days: bool,
    pub stacks_used: OrderedSet,
    pub content_types_used: OrderedSet,
    pub locales_used: OrderedSet,
    /// Sticky: once set it stays set.
    pub is_content_builder: bool,
    /// `publish` and `unpublish` events.
    pub publish_events: u64,
    pub create_events: u64,
    pub update_events: u64,
}

/// Activity windows, breadth of use and authoring behavior per user.
pub fn analyze_user_engagement(
    records: &[EventRecord],
    clock: &AnalysisClock,
) -> Vec<UserEngagement> {
    let mut users: Groups<&str, UserEngagement> = Groups::new();

    for record in records {
        let raw = &record.raw;
        if raw.created_by.is_empty() {
            continue;
        }

        let user = users.entry(raw.created_by.as_str(), || UserEngagement {
            user: raw.created_by.clone(),
            total_events: 0,
            last_activity: record.timestamp,
            active_in_last_30_days: false,
            active_in_last_90_days: false,
            stacks_used: OrderedSet::new(),
            content_types_used: OrderedSet::new(),
            locales_used: OrderedSet::new(),
            is_content_builder: false,
            publish_events: 0,
            create_events: 0,
            update_events: 0,
        });
        user.total_events += 1;
        user.last_activity = user.last_activity.max(record.timestamp);
        user.active_in_last_30_days |= clock.active_in_last_30_days(&record.timestamp);
        user.active_in_last_90_days |= clock.active_in_last_90_days(&record.timestamp);

        match raw.event.as_str() {
            "publish" | "unpublish" => user.publish_events += 1,
            "create" => user.create_events += 1,
            "update" => user.update_events += 1,
            _ => {}
        }
        user.is_content_builder |= MetricsCalculator::is_content_builder(
            user.create_events,
            user.update_events,
            user.publish_events,
        );

        if !raw.stack.is_empty() {
            user.stacks_used.insert(&raw.stack);
        }
        if let Some(content_type) = MetadataExtractor::content_type_uid(record) {
            user.content_types_used.insert(&content_type);
        }
        if let Some(locale) = MetadataExtractor::locale_code(record) {
            user.locales_used.insert(&locale);
        }
    }

    debug!("User engagement: {} users", users.len());
    let mut result = users.into_vec();
    sort_desc_by_key(&mut result, |u| u.total_events);
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::fixtures::{at, clock, days_ago};
    use serde_json::json;

    // ── analyze_user_activity ────────────────────────────────────────────────

    #[test]
    fn test_user_activity_create_then_update() {
        let records = vec![
            at("2024-06-01T10:00:00Z").user("alice").event("create").stack("s1").build(),
            at("2024-06-04T10:00:00Z").user("alice").event("update").stack("s1").build(),
        ];
        let users = analyze_user_activity(&records);

        assert_eq!(users.len(), 1);
        let alice = &users[0];
        assert_eq!(alice.user, "alice");
        assert_eq!(alice.total_events, 2);
        assert_eq!(alice.event_types["create"], 1);
        assert_eq!(alice.event_types["update"], 1);
        assert_eq!(alice.event_types.len(), 2);
        assert_eq!(alice.last_activity, EventTime::parse("2024-06-04T10:00:00Z"));
    }

    #[test]
    fn test_user_activity_keeps_all_users() {
        let records: Vec<EventRecord> = (0..25)
            .map(|i| at(&days_ago(1)).user(&format!("user{}", i)).build())
            .collect();
        assert_eq!(analyze_user_activity(&records).len(), 25);
    }

    #[test]
    fn test_user_activity_orgs_first_seen_and_sorted() {
        let records = vec![
            at(&days_ago(3)).user("bob").org("o2").build(),
            at(&days_ago(2)).user("alice").org("o1").build(),
            at(&days_ago(1)).user("bob").org("o1").build(),
            at(&days_ago(1)).user("bob").org("o2").build(),
            at(&days_ago(1)).org("o3").build(),
        ];
        let users = analyze_user_activity(&records);

        assert_eq!(users[0].user, "bob");
        assert_eq!(users[0].organizations.as_slice(), ["o2", "o1"]);
        assert_eq!(users[1].user, "alice");
    }

    #[test]
    fn test_user_activity_invalid_timestamp_never_wins() {
        let records = vec![
            at("garbage").user("alice").build(),
            at("2024-01-01T00:00:00Z").user("alice").build(),
        ];
        let users = analyze_user_activity(&records);
        assert_eq!(users[0].last_activity, EventTime::parse("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_user_activity_empty_input() {
        assert!(analyze_user_activity(&[]).is_empty());
    }

    // ── analyze_user_engagement ──────────────────────────────────────────────

    #[test]
    fn test_engagement_windows_are_sticky() {
        let records = vec![
            at(&days_ago(5)).user("alice").build(),
            at(&days_ago(200)).user("alice").build(),
            at(&days_ago(60)).user("bob").build(),
        ];
        let users = analyze_user_engagement(&records, &clock());

        let alice = &users[0];
        assert!(alice.active_in_last_30_days);
        assert!(alice.active_in_last_90_days);
        let bob = &users[1];
        assert!(!bob.active_in_last_30_days);
        assert!(bob.active_in_last_90_days);
    }

    #[test]
    fn test_engagement_content_builder_rules() {
        let mut records = Vec::new();
        for _ in 0..5 {
            records.push(at(&days_ago(1)).user("editor").event("update").build());
        }
        records.push(at(&days_ago(1)).user("viewer").event("read").build());
        records.push(at(&days_ago(1)).user("publisher").event("unpublish").build());

        let users = analyze_user_engagement(&records, &clock());
        let find = |name: &str| users.iter().find(|u| u.user == name).unwrap();

        assert!(!find("editor").is_content_builder);
        assert_eq!(find("editor").update_events, 5);
        assert!(!find("viewer").is_content_builder);
        assert!(find("publisher").is_content_builder);
        assert_eq!(find("publisher").publish_events, 1);

        records.push(at(&days_ago(1)).user("editor").event("update").build());
        let users = analyze_user_engagement(&records, &clock());
        assert!(users[0].is_content_builder);
    }

    #[test]
    fn test_engagement_distinct_usage_lists() {
        let records = vec![
            at(&days_ago(1))
                .user("alice")
                .stack("s1")
                .metadata(json!({"content_type": {"uid": "blog"}, "locale": {"code": "en-us"}}))
                .build(),
            at(&days_ago(1))
                .user("alice")
                .stack("s2")
                .metadata(json!({"content_type": {"uid": "page"}, "locale": {"code": "en-us"}}))
                .build(),
            at(&days_ago(1))
                .user("alice")
                .stack("s1")
                .metadata(json!({"content_type": {"title": "Only Title"}}))
                .build(),
        ];
        let users = analyze_user_engagement(&records, &clock());

        assert_eq!(users[0].stacks_used.as_slice(), ["s1", "s2"]);
        assert_eq!(users[0].content_types_used.as_slice(), ["blog", "page"]);
        assert_eq!(users[0].locales_used.as_slice(), ["en-us"]);
    }
}
