use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{error, info};

use feedlens_common::Result;

use crate::aggregate::Aggregates;
use crate::classify::{apply_categories, distinct_topics, TopicClassifier};
use crate::ingest::{load_dataset, IngestStats};
use crate::render::{plan_charts, render_all, ChartRenderer};
use crate::report::{Report, ReportWriter, Summary, WriteOutcome};

/// Timestamp format of per-run output directories.
pub const RUN_DIR_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// `<output_root>/<YYYY-MM-DD_HH-MM-SS>`, fixed once per run.
pub fn run_dir(output_root: &Path, started_at: NaiveDateTime) -> PathBuf {
    output_root.join(started_at.format(RUN_DIR_FORMAT).to_string())
}

/// What a run produced.
#[derive(Debug)]
pub struct AnalysisRun {
    pub output_dir: PathBuf,
    pub ingest: IngestStats,
    pub classifier: &'static str,
    pub report: Report,
    /// None when the report could not be written at all.
    pub report_file: Option<WriteOutcome>,
    pub charts: Vec<PathBuf>,
}

/// Ingest → classify → aggregate → recommend → report + charts.
///
/// Only failing to create `output_dir` is fatal. Everything downstream
/// degrades: bad input is skipped, classification falls back, chart and
/// report write failures are logged.
pub async fn run(
    classifier: &dyn TopicClassifier,
    renderer: &dyn ChartRenderer,
    data_dir: &Path,
    output_dir: &Path,
    started_at: NaiveDateTime,
) -> Result<AnalysisRun> {
    std::fs::create_dir_all(output_dir)?;
    info!(data_dir = %data_dir.display(), output_dir = %output_dir.display(), "Starting analysis");

    let dataset = load_dataset(data_dir);
    let ingest = dataset.stats;

    let topics = distinct_topics(&dataset.records);
    let categories = classifier.classify(&topics).await;
    info!(
        classifier = classifier.name(),
        topics = topics.len(),
        "Topics categorized"
    );
    let records = apply_categories(dataset.records, &categories);

    let aggregates = Aggregates::compute(&records);
    let charts = plan_charts(&aggregates);
    let summary = Summary::from_records(&records);
    let report = Report::from_aggregates(aggregates, summary, output_dir, started_at);

    let charts = render_all(renderer, &charts, output_dir);

    let report_file = match ReportWriter::new(output_dir).write(&report) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!(error = %e, "Report could not be written");
            None
        }
    };

    Ok(AnalysisRun {
        output_dir: output_dir.to_path_buf(),
        ingest,
        classifier: classifier.name(),
        report,
        report_file,
        charts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::day;

    #[test]
    fn run_dir_is_timestamped() {
        let started = day(2024, 3, 4).date().and_hms_opt(9, 5, 7).unwrap();
        assert_eq!(
            run_dir(Path::new("visualizations"), started),
            PathBuf::from("visualizations/2024-03-04_09-05-07")
        );
    }
}
