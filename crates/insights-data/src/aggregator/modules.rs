//! Per-module insights.

use std::collections::HashSet;

use insights_core::models::EventRecord;
use serde::Serialize;
use tracing::debug;

use super::{bump, sort_desc_by_key, EventCounter, Groups};

const MODULE_RECENT_ACTIVITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInsight {
    pub module: String,
    pub total_events: u64,
    pub events: EventCounter,
    pub unique_users: usize,
    pub unique_orgs: usize,
    /// Ten most recent records, newest first.
    pub recent_activity: Vec<EventRecord>,
}

struct ModuleAccumulator<'a> {
    module: &'a str,
    total_events: u64,
    events: EventCounter,
    users: HashSet<&'a str>,
    orgs: HashSet<&'a str>,
    records: Vec<&'a EventRecord>,
}

/// One row per non-empty `module`, busiest first, each with its ten newest records.
pub fn module_insights(records: &[EventRecord]) -> Vec<ModuleInsight> {
    let mut modules: Groups<&str, ModuleAccumulator> = Groups::new();

    for record in records {
        let raw = &record.raw;
        if raw.module.is_empty() {
            continue;
        }

        let acc = modules.entry(raw.module.as_str(), || ModuleAccumulator {
            module: raw.module.as_str(),
            total_events: 0,
            events: EventCounter::new(),
            users: HashSet::new(),
            orgs: HashSet::new(),
            records: Vec::new(),
        });
        acc.total_events += 1;
        bump(&mut acc.events, &raw.event);
        if !raw.created_by.is_empty() {
            acc.users.insert(raw.created_by.as_str());
        }
        if !raw.org_uid.is_empty() {
            acc.orgs.insert(raw.org_uid.as_str());
        }
        acc.records.push(record);
    }

    debug!("Module insights: {} modules", modules.len());
    let mut result: Vec<ModuleInsight> = modules
        .into_vec()
        .into_iter()
        .map(|mut acc| {
            acc.records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            ModuleInsight {
                module: acc.module.to_string(),
                total_events: acc.total_events,
                events: acc.events,
                unique_users: acc.users.len(),
                unique_orgs: acc.orgs.len(),
                recent_activity: acc
                    .records
                    .into_iter()
                    .take(MODULE_RECENT_ACTIVITY)
                    .cloned()
                    .collect(),
            }
        })
        .collect();
    sort_desc_by_key(&mut result, |m| m.total_events);
    result
}
