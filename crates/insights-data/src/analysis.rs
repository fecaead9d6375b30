//! Main analysis pipeline for audit-log insights.
//!
//! Loads and normalizes the input, runs every aggregator against one shared
//! [`AnalysisClock`], and writes the resulting [`AnalysisReport`] out as JSON
//! and per-report CSV files.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, SecondsFormat, Utc};
use insights_core::error::Result;
use insights_core::export::{export_file_name, flatten_for_export, write_csv, write_json};
use insights_core::models::EventRecord;
use insights_core::time_utils::AnalysisClock;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{
    analyze_audit_logs, analyze_content_type_activity, analyze_content_type_locale_adoption,
    analyze_locale_activity, analyze_org_activity, analyze_publish_metrics,
    analyze_stack_activity, analyze_stack_user_metrics, analyze_user_activity,
    analyze_user_engagement, module_insights, AnalyticsSummary, ContentTypeActivity,
    ContentTypeLocaleAdoption, LocaleActivity, ModuleInsight, OrgActivity, PublishMetrics,
    StackActivity, StackUserMetrics, UserActivity, UserEngagement,
};
use crate::reader::load_event_records;

/// File prefix of the combined JSON export.
pub const JSON_EXPORT_PREFIX: &str = "audit-analysis";

// ── Public types ──────────────────────────────────────────────────────────────

/// Every report computed over one record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub summary: AnalyticsSummary,
    pub user_activity: Vec<UserActivity>,
    pub user_engagement: Vec<UserEngagement>,
    pub org_activity: Vec<OrgActivity>,
    pub stack_activity: Vec<StackActivity>,
    pub locale_activity: Vec<LocaleActivity>,
    pub content_type_activity: Vec<ContentTypeActivity>,
    pub module_insights: Vec<ModuleInsight>,
    pub publish_metrics: Vec<PublishMetrics>,
    pub content_type_locale_adoption: Vec<ContentTypeLocaleAdoption>,
    pub stack_user_metrics: Vec<StackUserMetrics>,
    /// ISO-8601 instant of the analysis clock.
    pub exported_at: String,
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub files_read: usize,
    pub rows_read: usize,
    /// Rows without `created_at`.
    pub rows_dropped: usize,
    pub invalid_timestamps: usize,
    pub records_analyzed: usize,
    /// Wall-clock seconds spent reading and normalizing the CSV files.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent in the aggregators.
    pub aggregation_time_seconds: f64,
}

/// The complete output of [`analyze_input`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub report: AnalysisReport,
    pub metadata: AnalysisMetadata,
    /// Files the records came from, in read order.
    pub files: Vec<PathBuf>,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Run all eleven aggregators over `records`.
pub fn run_analysis(records: &[EventRecord], clock: &AnalysisClock) -> AnalysisReport {
    AnalysisReport {
        summary: analyze_audit_logs(records, clock),
        user_activity: analyze_user_activity(records),
        user_engagement: analyze_user_engagement(records, clock),
        org_activity: analyze_org_activity(records),
        stack_activity: analyze_stack_activity(records),
        locale_activity: analyze_locale_activity(records),
        content_type_activity: analyze_content_type_activity(records, clock),
        module_insights: module_insights(records),
        publish_metrics: analyze_publish_metrics(records, clock),
        content_type_locale_adoption: analyze_content_type_locale_adoption(records),
        stack_user_metrics: analyze_stack_user_metrics(records, clock),
        exported_at: clock.now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Run the full analysis pipeline.
///
/// 1. Discover and decode the CSV file(s) under `input`.
/// 2. Normalize rows into event records.
/// 3. Run [`run_analysis`] with `clock`.
/// 4. Return the report with timing and row statistics.
pub fn analyze_input(input: &Path, clock: &AnalysisClock) -> Result<AnalysisResult> {
    // ── Step 1-2: Load ────────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let (records, stats) = load_event_records(input)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 3: Aggregate ─────────────────────────────────────────────────────
    let aggregate_start = std::time::Instant::now();
    let report = run_analysis(&records, clock);
    let aggregation_time = aggregate_start.elapsed().as_secs_f64();

    debug!(
        "Analysis of {} records took {:.3}s load, {:.3}s aggregate",
        records.len(),
        load_time,
        aggregation_time
    );

    // ── Step 4: Build result ──────────────────────────────────────────────────
    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        files_read: stats.files.len(),
        rows_read: stats.normalize.rows_read,
        rows_dropped: stats.normalize.rows_dropped,
        invalid_timestamps: stats.normalize.invalid_timestamps,
        records_analyzed: records.len(),
        load_time_seconds: load_time,
        aggregation_time_seconds: aggregation_time,
    };

    Ok(AnalysisResult {
        report,
        metadata,
        files: stats.files,
    })
}

// ── Export ────────────────────────────────────────────────────────────────────

/// Write the whole report, unflattened, to `audit-analysis-<date>.json`.
pub fn write_json_report(
    report: &AnalysisReport,
    output_dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(export_file_name(JSON_EXPORT_PREFIX, date, "json"));
    let file = std::fs::File::create(&path)?;
    write_json(report, std::io::BufWriter::new(file))?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// Write one flattened CSV per list report plus the summary's recent activity.
///
/// Reports with no rows produce no file.
pub fn write_csv_reports(
    report: &AnalysisReport,
    output_dir: &Path,
    date: NaiveDate,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let tables = [
        ("user-activity", flatten_for_export(&report.user_activity)?),
        ("user-engagement", flatten_for_export(&report.user_engagement)?),
        ("org-activity", flatten_for_export(&report.org_activity)?),
        ("stack-activity", flatten_for_export(&report.stack_activity)?),
        ("locale-activity", flatten_for_export(&report.locale_activity)?),
        (
            "content-type-activity",
            flatten_for_export(&report.content_type_activity)?,
        ),
        ("module-insights", flatten_for_export(&report.module_insights)?),
        ("publish-metrics", flatten_for_export(&report.publish_metrics)?),
        (
            "content-type-locale-adoption",
            flatten_for_export(&report.content_type_locale_adoption)?,
        ),
        (
            "stack-user-metrics",
            flatten_for_export(&report.stack_user_metrics)?,
        ),
        (
            "recent-activity",
            flatten_for_export(&report.summary.recent_activity)?,
        ),
    ];

    let mut written = Vec::new();
    for (name, rows) in tables {
        if rows.is_empty() {
            debug!("Skipping empty report {}", name);
            continue;
        }
        let path = output_dir.join(export_file_name(name, date, "csv"));
        let file = std::fs::File::create(&path)?;
        write_csv(&rows, std::io::BufWriter::new(file))?;
        written.push(path);
    }

    info!("Wrote {} CSV report(s) to {}", written.len(), output_dir.display());
    Ok(written)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
