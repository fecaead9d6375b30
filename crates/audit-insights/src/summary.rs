//! Plain-text overview printed after an analysis run.

use std::fmt::Write;
use std::path::PathBuf;

use insights_core::formatting::{
    format_bytes, format_compact, format_date, format_number, format_relative_time, percentage,
};
use insights_core::time_utils::AnalysisClock;
use insights_data::analysis::AnalysisResult;

const TOP_ROWS: usize = 5;

/// Render the console summary for `result`.
pub fn render(
    result: &AnalysisResult,
    clock: &AnalysisClock,
    input_bytes: u64,
    written: &[PathBuf],
) -> String {
    let summary = &result.report.summary;
    let meta = &result.metadata;
    let users = &summary.user_activity_summary;
    let content_types = &summary.content_type_usage_summary;

    let mut out = String::new();
    let _ = writeln!(out, "Audit log analysis as of {}", format_date(&clock.now()));
    let _ = writeln!(
        out,
        "  Input          {} file(s), {}, {} rows ({} dropped, {} invalid timestamps)",
        meta.files_read,
        format_bytes(input_bytes),
        format_number(meta.rows_read as f64, 0),
        meta.rows_dropped,
        meta.invalid_timestamps
    );
    let _ = writeln!(
        out,
        "  Events         {} from {} users across {} stacks",
        format_compact(summary.total_events as u64),
        summary.unique_users,
        summary.unique_stacks
    );
    let _ = writeln!(
        out,
        "  Active users   {} in 30d ({:.1}%), {} in 90d ({:.1}%), {} inactive",
        users.active_in_last_30_days,
        percentage(users.active_in_last_30_days as f64, users.total_users as f64, 1),
        users.active_in_last_90_days,
        percentage(users.active_in_last_90_days as f64, users.total_users as f64, 1),
        users.never_active
    );
    let _ = writeln!(
        out,
        "  Content types  {} used, {} in 30d, {} in 90d, {} idle",
        content_types.total_content_types,
        content_types.used_in_last_30_days,
        content_types.used_in_last_90_days,
        content_types.never_used
    );

    if !summary.top_users.is_empty() {
        let _ = writeln!(out, "\nTop users");
        for user in summary.top_users.iter().take(TOP_ROWS) {
            let _ = writeln!(
                out,
                "  {:<32} {:>8}  {}",
                user.user,
                format_number(user.count as f64, 0),
                format_relative_time(&user.last_activity, clock.now())
            );
        }
    }

    if !summary.top_stacks.is_empty() {
        let _ = writeln!(out, "\nTop stacks");
        for stack in summary.top_stacks.iter().take(TOP_ROWS) {
            let _ = writeln!(
                out,
                "  {:<32} {:>8}  {} users",
                stack.stack,
                format_number(stack.count as f64, 0),
                stack.unique_users
            );
        }
    }

    if !written.is_empty() {
        let _ = writeln!(out, "\nWritten");
        for path in written {
            let _ = writeln!(out, "  {}", path.display());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use insights_core::models::{EventRecord, EventTime, RawRecord};
    use insights_data::analysis::{run_analysis, AnalysisMetadata};

    fn record(user: &str, stack: &str, created_at: &str) -> EventRecord {
        EventRecord {
            raw: RawRecord {
                created_at: created_at.to_string(),
                created_by: user.to_string(),
                stack: stack.to_string(),
                ..Default::default()
            },
            parsed_metadata: None,
            parsed_payload: None,
            parsed_request: None,
            parsed_response: None,
            timestamp: EventTime::parse(created_at),
        }
    }

    fn result(records: &[EventRecord], clock: &AnalysisClock) -> AnalysisResult {
        AnalysisResult {
            report: run_analysis(records, clock),
            metadata: AnalysisMetadata {
                generated_at: clock.now().to_rfc3339(),
                files_read: 1,
                rows_read: records.len() + 1,
                rows_dropped: 1,
                invalid_timestamps: 0,
                records_analyzed: records.len(),
                load_time_seconds: 0.0,
                aggregation_time_seconds: 0.0,
            },
            files: vec![PathBuf::from("audit.csv")],
        }
    }

    #[test]
    fn test_render_overview() {
        let clock = AnalysisClock::at(Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap());
        let records = vec![
            record("alice", "s1", "2024-06-30T09:00:00Z"),
            record("alice", "s1", "2024-06-29T09:00:00Z"),
            record("bob", "s2", "2024-01-01T09:00:00Z"),
        ];
        let written = vec![PathBuf::from("out/audit-analysis-2024-06-30.json")];

        let text = render(&result(&records, &clock), &clock, 2048, &written);

        assert!(text.starts_with("Audit log analysis as of Jun 30, 2024, 12:00"));
        assert!(text.contains("1 file(s), 2 KB, 4 rows (1 dropped, 0 invalid timestamps)"));
        assert!(text.contains("3 from 2 users across 2 stacks"));
        assert!(text.contains("1 in 30d (50.0%), 1 in 90d (50.0%), 1 inactive"));
        assert!(text.contains("3h ago"));
        assert!(text.contains("Top stacks"));
        assert!(text.contains("out/audit-analysis-2024-06-30.json"));
    }

    #[test]
    fn test_render_without_users_or_exports() {
        let clock = AnalysisClock::at(Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap());
        let records = vec![record("", "", "2024-06-30T09:00:00Z")];

        let text = render(&result(&records, &clock), &clock, 0, &[]);

        assert!(!text.contains("Top users"));
        assert!(!text.contains("Written"));
        assert!(text.contains("0 Bytes"));
    }
}
