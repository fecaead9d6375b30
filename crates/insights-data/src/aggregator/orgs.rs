//! Per-organization activity.

use insights_core::models::{EventRecord, OrderedSet};
use serde::Serialize;
use tracing::debug;

use super::{bump, sort_desc_by_key, EventCounter, Groups};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgActivity {
    pub org: String,
    pub total_events: u64,
    pub unique_users: usize,
    pub event_types: EventCounter,
    pub users: OrderedSet,
}

/// One row per `org_uid`, busiest first.
pub fn analyze_org_activity(records: &[EventRecord]) -> Vec<OrgActivity> {
    let mut orgs: Groups<&str, OrgActivity> = Groups::new();

    for record in records {
        let raw = &record.raw;
        if raw.org_uid.is_empty() {
            continue;
        }

        let org = orgs.entry(raw.org_uid.as_str(), || OrgActivity {
            org: raw.org_uid.clone(),
            total_events: 0,
            unique_users: 0,
            event_types: EventCounter::new(),
            users: OrderedSet::new(),
        });
        org.total_events += 1;
        bump(&mut org.event_types, &raw.event);
        if !raw.created_by.is_empty() {
            org.users.insert(&raw.created_by);
        }
        org.unique_users = org.users.len();
    }

    debug!("Org activity: {} organizations", orgs.len());
    let mut result = orgs.into_vec();
    sort_desc_by_key(&mut result, |o| o.total_events);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::fixtures::{at, days_ago};

    #[test]
    fn test_org_activity_groups_and_counts_users() {
        let records = vec![
            at(&days_ago(1)).org("o1").user("alice").event("create").build(),
            at(&days_ago(1)).org("o2").user("bob").event("create").build(),
            at(&days_ago(1)).org("o2").user("carol").event("publish").build(),
            at(&days_ago(1)).org("o2").user("bob").event("publish").build(),
            at(&days_ago(1)).org("o2").event("publish").build(),
            at(&days_ago(1)).user("dave").build(),
        ];
        let orgs = analyze_org_activity(&records);

        assert_eq!(orgs.len(), 2);
        let o2 = &orgs[0];
        assert_eq!(o2.org, "o2");
        assert_eq!(o2.total_events, 4);
        assert_eq!(o2.unique_users, 2);
        assert_eq!(o2.users.as_slice(), ["bob", "carol"]);
        assert_eq!(o2.event_types["publish"], 3);
        assert_eq!(orgs[1].unique_users, 1);
    }

    #[test]
    fn test_org_activity_untruncated() {
        let records: Vec<EventRecord> = (0..25)
            .map(|i| at(&days_ago(1)).org(&format!("org{}", i)).build())
            .collect();
        assert_eq!(analyze_org_activity(&records).len(), 25);
    }

    #[test]
    fn test_org_activity_empty_input() {
        assert!(analyze_org_activity(&[]).is_empty());
    }
}
