//! The eleven report aggregators.
//!
//! Each aggregator is a pure function over the full, already normalized
//! record slice. Groups are created in first-seen order and every
//! descending sort is stable, so ties keep that order. Functions that
//! classify activity windows take an [`AnalysisClock`] instead of reading
//! the wall clock.
//!
//! [`AnalysisClock`]: insights_core::time_utils::AnalysisClock

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

pub mod content_types;
pub mod locales;
pub mod modules;
pub mod orgs;
pub mod stacks;
pub mod summary;
pub mod users;

pub use content_types::{
    analyze_content_type_activity, analyze_content_type_locale_adoption, analyze_publish_metrics,
    ContentTypeActivity, ContentTypeLocaleAdoption, PublishMetrics, PublishPeriods, PublisherCount,
};
pub use locales::{analyze_locale_activity, LocaleActivity};
pub use modules::{module_insights, ModuleInsight};
pub use orgs::{analyze_org_activity, OrgActivity};
pub use stacks::{
    analyze_stack_activity, analyze_stack_user_metrics, StackActivity, StackUserDetail,
    StackUserMetrics,
};
pub use summary::{
    analyze_audit_logs, AnalyticsSummary, ContentTypeUsageSummary, DayBucket, HourBucket,
    StackUsageRatio, TopStack, TopUser, UserActivitySummary,
};
pub use users::{analyze_user_activity, analyze_user_engagement, UserActivity, UserEngagement};

/// Event name → occurrences. Ordered by key so output is deterministic.
pub type EventCounter = BTreeMap<String, u64>;

/// Increment `key` in `counter`.
pub(crate) fn bump(counter: &mut EventCounter, key: &str) {
    *counter.entry(key.to_string()).or_insert(0) += 1;
}

// ── Groups ────────────────────────────────────────────────────────────────────

/// Per-key accumulators kept in first-seen order.
pub(crate) struct Groups<K, T> {
    items: Vec<T>,
    index: HashMap<K, usize>,
}

impl<K: Hash + Eq, T> Groups<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The accumulator for `key`, created with `init` on first sight.
    pub(crate) fn entry(&mut self, key: K, init: impl FnOnce() -> T) -> &mut T {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.items.push(init());
                self.index.insert(key, self.items.len() - 1);
                self.items.len() - 1
            }
        };
        &mut self.items[slot]
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn into_vec(self) -> Vec<T> {
        self.items
    }
}

/// Stable descending sort on an integer key.
pub(crate) fn sort_desc_by_key<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

// ── Test fixtures ─────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
    use insights_core::models::{EventRecord, RawRecord};
    use insights_core::time_utils::AnalysisClock;
    use serde_json::Value;

    use crate::normalizer::normalize_record;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    pub fn clock() -> AnalysisClock {
        AnalysisClock::at(now())
    }

    /// RFC 3339 text for `days` before the fixture clock.
    pub fn days_ago(days: i64) -> String {
        (now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub struct RecordBuilder {
        raw: RawRecord,
    }

    /// A record created at `created_at`; every other column starts empty.
    pub fn at(created_at: &str) -> RecordBuilder {
        RecordBuilder {
            raw: RawRecord {
                created_at: created_at.to_string(),
                ..Default::default()
            },
        }
    }

    impl RecordBuilder {
        pub fn user(mut self, v: &str) -> Self {
            self.raw.created_by = v.to_string();
            self
        }

        pub fn event(mut self, v: &str) -> Self {
            self.raw.event = v.to_string();
            self
        }

        pub fn module(mut self, v: &str) -> Self {
            self.raw.module = v.to_string();
            self
        }

        pub fn stack(mut self, v: &str) -> Self {
            self.raw.stack = v.to_string();
            self
        }

        pub fn org(mut self, v: &str) -> Self {
            self.raw.org_uid = v.to_string();
            self
        }

        pub fn metadata(mut self, v: Value) -> Self {
            self.raw.metadata = v.to_string();
            self
        }

        pub fn payload(mut self, v: Value) -> Self {
            self.raw.payload = v.to_string();
            self
        }

        pub fn build(self) -> EventRecord {
            normalize_record(self.raw).expect("fixture records carry created_at")
        }
    }
}
