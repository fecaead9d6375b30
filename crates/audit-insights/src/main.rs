mod bootstrap;
mod summary;

use anyhow::{Context, Result};
use insights_core::settings::Settings;
use insights_data::analysis::{analyze_input, write_csv_reports, write_json_report};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();
    settings.validate()?;

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Audit Insights v{} starting", env!("CARGO_PKG_VERSION"));

    let clock = settings.analysis_clock();
    tracing::info!(
        "Input: {}, Timezone: {}, Now: {}",
        settings.input.display(),
        clock.timezone(),
        clock.now().to_rfc3339()
    );

    let result = analyze_input(&settings.input, &clock)
        .with_context(|| format!("Failed to analyse {}", settings.input.display()))?;
    tracing::debug!(
        "Analysis metadata: {}",
        serde_json::to_string(&result.metadata)?
    );

    let export_date = clock.now().with_timezone(&clock.timezone()).date_naive();
    let mut written = Vec::new();
    if settings.writes_json() {
        written.push(write_json_report(
            &result.report,
            &settings.output_dir,
            export_date,
        )?);
    }
    if settings.writes_csv() {
        written.extend(write_csv_reports(
            &result.report,
            &settings.output_dir,
            export_date,
        )?);
    }

    let input_bytes: u64 = result
        .files
        .iter()
        .filter_map(|path| std::fs::metadata(path).ok())
        .map(|meta| meta.len())
        .sum();

    print!(
        "{}",
        summary::render(&result, &clock, input_bytes, &written)
    );

    Ok(())
}
