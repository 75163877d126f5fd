use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};

use feedlens_common::{FeedlensError, Result};

use crate::aggregate::{
    Aggregates, ContentCategorization, Counts, EngagementInsights, KeyMetrics, Ratios,
    TrendAnalysis,
};
use crate::classify::ClassifiedRecord;
use crate::recommend::{recommend, Recommendations};

pub const REPORT_FILE: &str = "tweet_analysis_report.json";

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub analysis_timestamp: NaiveDateTime,
    pub output_directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_records: usize,
    /// Absent for an empty dataset.
    pub date_range: Option<DateRange>,
    pub unique_topics: usize,
    pub unique_categories: usize,
}

impl Summary {
    pub fn from_records(records: &[ClassifiedRecord]) -> Self {
        let dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.record.date()).collect();
        let date_range = match (dates.first(), dates.last()) {
            (Some(&start), Some(&end)) => Some(DateRange { start, end }),
            _ => None,
        };
        Self {
            total_records: records.len(),
            date_range,
            unique_topics: records.iter().map(|r| r.topic()).collect::<BTreeSet<_>>().len(),
            unique_categories: records.iter().map(|r| r.category).collect::<BTreeSet<_>>().len(),
        }
    }
}

/// The full analysis document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub metadata: Metadata,
    pub summary: Summary,
    pub content_categorization: ContentCategorization,
    pub key_metrics: KeyMetrics,
    pub trend_analysis: TrendAnalysis,
    pub engagement_insights: EngagementInsights,
    pub actionable_insights: Recommendations,
}

impl Report {
    pub fn build(
        records: &[ClassifiedRecord],
        output_dir: &Path,
        generated_at: NaiveDateTime,
    ) -> Self {
        let aggregates = Aggregates::compute(records);
        Self::from_aggregates(
            aggregates,
            Summary::from_records(records),
            output_dir,
            generated_at,
        )
    }

    pub fn from_aggregates(
        aggregates: Aggregates,
        summary: Summary,
        output_dir: &Path,
        generated_at: NaiveDateTime,
    ) -> Self {
        let actionable_insights = recommend(&aggregates);
        Self {
            metadata: Metadata {
                analysis_timestamp: generated_at,
                output_directory: output_dir.to_path_buf(),
            },
            summary,
            content_categorization: aggregates.content,
            key_metrics: aggregates.key_metrics,
            trend_analysis: aggregates.trends,
            engagement_insights: aggregates.engagement,
            actionable_insights,
        }
    }

    /// The minimal document written when the full one cannot be serialized.
    pub fn reduced(&self, error: impl fmt::Display) -> ReducedReport<'_> {
        ReducedReport {
            metadata: &self.metadata,
            summary: &self.summary,
            key_metrics: ReducedMetrics {
                emotion_distribution: &self.key_metrics.emotion_distribution,
                category_frequency: &self.key_metrics.category_frequency,
                humor_rate: self.key_metrics.humor_rate,
            },
            error: format!("Full report failed to serialize: {error}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReducedMetrics<'a> {
    pub emotion_distribution: &'a Ratios,
    pub category_frequency: &'a Counts,
    pub humor_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct ReducedReport<'a> {
    pub metadata: &'a Metadata,
    pub summary: &'a Summary,
    pub key_metrics: ReducedMetrics<'a>,
    pub error: String,
}

// =============================================================================
// Console summary
// =============================================================================

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Analysis Summary ===")?;
        writeln!(f, "Records analyzed:  {}", self.summary.total_records)?;
        match &self.summary.date_range {
            Some(range) => writeln!(f, "Date range:        {} to {}", range.start, range.end)?,
            None => writeln!(f, "Date range:        n/a")?,
        }
        writeln!(f, "Unique topics:     {}", self.summary.unique_topics)?;
        writeln!(f, "Unique categories: {}", self.summary.unique_categories)?;
        writeln!(
            f,
            "Humor rate:        {:.1}%",
            self.key_metrics.humor_rate * 100.0
        )?;
        writeln!(
            f,
            "Political content: {:.1}%",
            self.key_metrics.political_content_ratio * 100.0
        )?;

        if !self.key_metrics.emotion_distribution.is_empty() {
            writeln!(f, "\nEmotions:")?;
            let mut emotions: Vec<_> = self.key_metrics.emotion_distribution.iter().collect();
            emotions.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (emotion, share) in emotions {
                writeln!(f, "  {emotion:<20} {:>5.1}%", share * 100.0)?;
            }
        }

        write_top(f, "Top categories", &self.key_metrics.category_frequency)?;
        write_top(f, "Top topics", &self.key_metrics.topic_frequency)?;

        if !self.actionable_insights.recommendations.is_empty() {
            writeln!(f, "\nRecommendations:")?;
            for rec in &self.actionable_insights.recommendations {
                writeln!(f, "  - {rec}")?;
            }
        }
        writeln!(f, "\nOutput directory: {}", self.metadata.output_directory.display())
    }
}

const SUMMARY_TOP: usize = 5;

fn write_top(f: &mut fmt::Formatter<'_>, heading: &str, counts: &Counts) -> fmt::Result {
    if counts.is_empty() {
        return Ok(());
    }
    writeln!(f, "\n{heading}:")?;
    let mut entries: Vec<_> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (key, count) in entries.into_iter().take(SUMMARY_TOP) {
        writeln!(f, "  {key:<30} {count}")?;
    }
    Ok(())
}

// =============================================================================
// Writer
// =============================================================================

/// Which document ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Full(PathBuf),
    Reduced(PathBuf),
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Full(p) | WriteOutcome::Reduced(p) => p,
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, doc: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Write `full`; on any failure write `reduced(error)` instead. Errors only
/// when neither document could be written.
pub fn write_with_fallback<F, R>(path: &Path, full: &F, reduced: impl FnOnce(&str) -> R) -> Result<WriteOutcome>
where
    F: Serialize + ?Sized,
    R: Serialize,
{
    match write_json(path, full) {
        Ok(()) => Ok(WriteOutcome::Full(path.to_path_buf())),
        Err(full_err) => {
            let full_err = full_err.to_string();
            warn!(path = %path.display(), error = %full_err, "Full report failed, writing reduced report");
            write_json(path, &reduced(&full_err))
                .map(|()| WriteOutcome::Reduced(path.to_path_buf()))
                .map_err(|e| {
                    FeedlensError::Report(format!(
                        "could not write {}: {e} (full report: {full_err})",
                        path.display()
                    ))
                })
        }
    }
}

/// Persists a [`Report`] into a run's output directory.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    pub fn write(&self, report: &Report) -> Result<WriteOutcome> {
        let outcome = write_with_fallback(&self.path(), report, |e| report.reduced(e))?;
        info!(path = %outcome.path().display(), reduced = matches!(outcome, WriteOutcome::Reduced(_)), "Report written");
        Ok(outcome)
    }
}
