// Chart planning and output.
//
// The plan is pure: it decides which charts a dataset supports and extracts
// the data each one needs. A ChartRenderer turns a planned chart into a file
// in the run's output directory.

mod png;
mod vega_lite;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use feedlens_common::Result;

use crate::aggregate::{Aggregates, Counts};

pub use png::PngRenderer;
pub use vega_lite::{vega_lite_spec, VegaLiteRenderer};

pub const TOP_TOPICS: usize = 10;
pub const TOPIC_LABEL_MAX: usize = 30;

/// One labelled line of a time series.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(NaiveDate, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Emotion counts, largest first.
    Emotions { bars: Vec<(String, usize)> },
    /// Top topics beside the category share.
    TopicsAndCategories {
        topics: Vec<(String, usize)>,
        categories: Vec<(String, usize)>,
    },
    /// Category × emotion counts, dense. `cells[row][column]`.
    Heatmap {
        rows: Vec<String>,
        columns: Vec<String>,
        cells: Vec<Vec<usize>>,
    },
    /// Daily volume plus per-emotion and per-category daily counts.
    TimeSeries {
        volume: Vec<(NaiveDate, usize)>,
        emotions: Vec<Series>,
        categories: Vec<Series>,
    },
}

/// One planned chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub name: &'static str,
    pub title: &'static str,
    pub data: ChartData,
}

/// Shorten a topic label to `TOPIC_LABEL_MAX` characters plus "...".
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() > TOPIC_LABEL_MAX {
        let head: String = label.chars().take(TOPIC_LABEL_MAX).collect();
        format!("{head}...")
    } else {
        label.to_string()
    }
}

/// Entries sorted by count descending, ties by key.
fn ranked(counts: &Counts) -> Vec<(String, usize)> {
    let mut entries: Vec<_> = counts.iter().map(|(k, &v)| (k.clone(), v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

fn emotion_chart(agg: &Aggregates) -> Chart {
    Chart {
        name: "emotion_distribution",
        title: "Emotion Distribution",
        data: ChartData::Emotions {
            bars: ranked(&agg.key_metrics.emotion_frequency),
        },
    }
}

fn topics_and_categories_chart(agg: &Aggregates) -> Chart {
    let topics = ranked(&agg.key_metrics.topic_frequency)
        .into_iter()
        .take(TOP_TOPICS)
        .map(|(topic, count)| (truncate_label(&topic), count))
        .collect();

    Chart {
        name: "topics_and_categories",
        title: "Topics and Categories",
        data: ChartData::TopicsAndCategories {
            topics,
            categories: ranked(&agg.key_metrics.category_frequency),
        },
    }
}

fn heatmap_chart(agg: &Aggregates) -> Chart {
    let columns: Vec<String> = agg.key_metrics.emotion_frequency.keys().cloned().collect();
    let rows: Vec<String> = agg.content.emotion_by_category.keys().cloned().collect();
    let cells = agg
        .content
        .emotion_by_category
        .values()
        .map(|row| {
            columns
                .iter()
                .map(|emotion| row.get(emotion).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    Chart {
        name: "emotion_category_heatmap",
        title: "Emotions by Category",
        data: ChartData::Heatmap { rows, columns, cells },
    }
}

/// Pivot a day × value grid into one series per value.
fn series(grid: &BTreeMap<NaiveDate, Counts>) -> Vec<Series> {
    let mut lines: BTreeMap<&str, Vec<(NaiveDate, usize)>> = BTreeMap::new();
    for (date, row) in grid {
        for (key, &count) in row {
            lines.entry(key).or_default().push((*date, count));
        }
    }
    lines
        .into_iter()
        .map(|(name, points)| Series {
            name: name.to_string(),
            points,
        })
        .collect()
}

fn time_series_chart(agg: &Aggregates) -> Chart {
    Chart {
        name: "time_series_analysis",
        title: "Time Series Analysis",
        data: ChartData::TimeSeries {
            volume: agg
                .trends
                .daily_counts
                .iter()
                .map(|(date, &count)| (*date, count))
                .collect(),
            emotions: series(&agg.trends.emotion_trends),
            categories: series(&agg.trends.category_trends),
        },
    }
}

/// Decide which charts the data supports.
///
/// Nothing for an empty dataset. The heatmap needs more than one record and
/// the time series more than one distinct day.
pub fn plan_charts(agg: &Aggregates) -> Vec<Chart> {
    if agg.total_records == 0 {
        return Vec::new();
    }

    let mut charts = vec![emotion_chart(agg), topics_and_categories_chart(agg)];
    if agg.total_records > 1 {
        charts.push(heatmap_chart(agg));
    }
    if agg.trends.daily_counts.len() > 1 {
        charts.push(time_series_chart(agg));
    }
    debug!(charts = charts.len(), "Planned charts");
    charts
}

// =============================================================================
// Renderers
// =============================================================================

pub trait ChartRenderer: Send + Sync {
    /// Write `chart` into `dir`, returning the file path.
    fn render(&self, chart: &Chart, dir: &Path) -> Result<PathBuf>;
}

/// Render every chart. A chart that fails is logged and skipped.
pub fn render_all(renderer: &dyn ChartRenderer, charts: &[Chart], dir: &Path) -> Vec<PathBuf> {
    let mut written = Vec::with_capacity(charts.len());
    for chart in charts {
        match renderer.render(chart, dir) {
            Ok(path) => written.push(path),
            Err(e) => warn!(chart = chart.name, error = %e, "Chart rendering failed"),
        }
    }
    info!(charts = written.len(), dir = %dir.display(), "Charts rendered");
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{classified, day, record};
    use feedlens_common::Category;

    fn names(charts: &[Chart]) -> Vec<&str> {
        charts.iter().map(|c| c.name).collect()
    }

    #[test]
    fn nothing_for_empty_data() {
        assert!(plan_charts(&Aggregates::default()).is_empty());
    }

    #[test]
    fn single_record_skips_heatmap_and_time_series() {
        let records = vec![classified(record("t", "joy", false, day(2024, 3, 4)), Category::Other)];
        let charts = plan_charts(&Aggregates::compute(&records));
        assert_eq!(names(&charts), vec!["emotion_distribution", "topics_and_categories"]);
    }

    #[test]
    fn single_day_skips_time_series() {
        let records = vec![
            classified(record("a", "joy", false, day(2024, 3, 4)), Category::Other),
            classified(record("b", "anger", false, day(2024, 3, 4)), Category::Sports),
        ];
        let charts = plan_charts(&Aggregates::compute(&records));
        assert_eq!(
            names(&charts),
            vec!["emotion_distribution", "topics_and_categories", "emotion_category_heatmap"]
        );

        let ChartData::Heatmap { rows, columns, cells } = &charts[2].data else {
            panic!("expected heatmap, got {:?}", charts[2].data);
        };
        assert_eq!(rows, &vec!["Other".to_string(), "Sports".to_string()]);
        assert_eq!(columns, &vec!["anger".to_string(), "joy".to_string()]);
        assert_eq!(cells, &vec![vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn multi_day_adds_time_series() {
        let records = vec![
            classified(record("a", "joy", false, day(2024, 3, 4)), Category::Other),
            classified(record("b", "anger", false, day(2024, 3, 5)), Category::Sports),
        ];
        let charts = plan_charts(&Aggregates::compute(&records));
        assert_eq!(charts.len(), 4);
        assert_eq!(charts[3].name, "time_series_analysis");

        let ChartData::TimeSeries { volume, emotions, .. } = &charts[3].data else {
            panic!("expected time series, got {:?}", charts[3].data);
        };
        assert_eq!(volume.len(), 2);
        let joy = emotions.iter().find(|s| s.name == "joy").unwrap();
        assert_eq!(joy.points.iter().map(|p| p.1).collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn top_topics_are_capped_and_truncated() {
        let long = "A very long topic name that keeps going and going";
        let mut records: Vec<_> = (0..12)
            .map(|i| classified(record(&format!("topic {i:02}"), "joy", false, day(2024, 3, 4)), Category::Other))
            .collect();
        records.push(classified(record(long, "joy", false, day(2024, 3, 4)), Category::Other));
        records.push(classified(record(long, "joy", false, day(2024, 3, 4)), Category::Other));

        let charts = plan_charts(&Aggregates::compute(&records));
        let ChartData::TopicsAndCategories { topics, .. } = &charts[1].data else {
            panic!("expected topics chart, got {:?}", charts[1].data);
        };
        assert_eq!(topics.len(), TOP_TOPICS);
        assert_eq!(topics[0], ("A very long topic name that ke...".to_string(), 2));
    }

    #[test]
    fn truncate_label_respects_chars() {
        assert_eq!(truncate_label("short"), "short");
        let exact: String = "é".repeat(TOPIC_LABEL_MAX);
        assert_eq!(truncate_label(&exact), exact);
        let over: String = "é".repeat(TOPIC_LABEL_MAX + 1);
        assert_eq!(truncate_label(&over), format!("{exact}..."));
    }

    #[test]
    fn render_all_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![classified(record("t", "joy", false, day(2024, 3, 4)), Category::Other)];
        let charts = plan_charts(&Aggregates::compute(&records));
        let written = render_all(&VegaLiteRenderer, &charts, &dir.path().join("missing"));
        assert!(written.is_empty());
    }
}
