// Pure statistics over classified records.
//
// All maps are ordered so serialized output is stable. Every function accepts
// an empty slice and returns empty maps or 0.0.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::classify::ClassifiedRecord;

pub type Counts = BTreeMap<String, usize>;
pub type Ratios = BTreeMap<String, f64>;

/// Emotions that count towards emotional intensity.
pub const VOLATILE_EMOTIONS: [&str; 3] = ["anger", "joy", "sadness"];

/// Distinct days required before weekday patterns are reported.
pub const MIN_DAYS_FOR_WEEKLY: usize = 7;

/// Which record field to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Topic,
    Category,
    Emotion,
}

impl Dimension {
    pub fn key(self, r: &ClassifiedRecord) -> &str {
        match self {
            Dimension::Topic => r.topic(),
            Dimension::Category => r.category_label(),
            Dimension::Emotion => r.emotion(),
        }
    }
}

// =============================================================================
// Distributions
// =============================================================================

pub fn frequency(records: &[ClassifiedRecord], dim: Dimension) -> Counts {
    let mut counts = Counts::new();
    for r in records {
        *counts.entry(dim.key(r).to_string()).or_default() += 1;
    }
    counts
}

/// Counts normalized to sum to 1.0.
pub fn proportions(counts: &Counts) -> Ratios {
    let total: usize = counts.values().sum();
    if total == 0 {
        return Ratios::new();
    }
    counts
        .iter()
        .map(|(k, &n)| (k.clone(), n as f64 / total as f64))
        .collect()
}

/// Emotion counts within each group. Only emotions seen in a group appear.
pub fn emotion_by(records: &[ClassifiedRecord], group: Dimension) -> BTreeMap<String, Counts> {
    let mut table: BTreeMap<String, Counts> = BTreeMap::new();
    for r in records {
        *table
            .entry(group.key(r).to_string())
            .or_default()
            .entry(r.emotion().to_string())
            .or_default() += 1;
    }
    table
}

// =============================================================================
// Rates
// =============================================================================

fn rate(hits: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

pub fn humor_rate(records: &[ClassifiedRecord]) -> f64 {
    rate(records.iter().filter(|r| r.record.humor).count(), records.len())
}

pub fn political_ratio(records: &[ClassifiedRecord]) -> f64 {
    rate(
        records.iter().filter(|r| r.record.is_political()).count(),
        records.len(),
    )
}

fn is_volatile(emotion: &str) -> bool {
    VOLATILE_EMOTIONS.contains(&emotion)
}

/// Per-group fraction of records matching `pred`.
fn rate_by(
    records: &[ClassifiedRecord],
    group: Dimension,
    pred: impl Fn(&ClassifiedRecord) -> bool,
) -> Ratios {
    let mut tallies: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for r in records {
        let entry = tallies.entry(group.key(r).to_string()).or_default();
        entry.1 += 1;
        if pred(r) {
            entry.0 += 1;
        }
    }
    tallies
        .into_iter()
        .map(|(k, (hits, total))| (k, rate(hits, total)))
        .collect()
}

pub fn humor_rate_by(records: &[ClassifiedRecord], group: Dimension) -> Ratios {
    rate_by(records, group, |r| r.record.humor)
}

/// Number of humorous records per group. Groups with none are omitted.
pub fn humorous_counts_by(records: &[ClassifiedRecord], group: Dimension) -> Counts {
    let mut counts = Counts::new();
    for r in records.iter().filter(|r| r.record.humor) {
        *counts.entry(group.key(r).to_string()).or_default() += 1;
    }
    counts
}

/// Fraction of each group's records carrying a volatile emotion.
pub fn emotional_intensity_by(records: &[ClassifiedRecord], group: Dimension) -> Ratios {
    rate_by(records, group, |r| is_volatile(r.emotion()))
}

/// Distinct values of `dim` divided by record count.
pub fn diversity_score(records: &[ClassifiedRecord], dim: Dimension) -> f64 {
    let distinct: BTreeSet<&str> = records.iter().map(|r| dim.key(r)).collect();
    rate(distinct.len(), records.len())
}

// =============================================================================
// Time series
// =============================================================================

pub fn distinct_dates(records: &[ClassifiedRecord]) -> BTreeSet<NaiveDate> {
    records.iter().map(|r| r.record.date()).collect()
}

pub fn daily_counts(records: &[ClassifiedRecord]) -> BTreeMap<NaiveDate, usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry(r.record.date()).or_default() += 1;
    }
    counts
}

/// Day × value grid. Every day carries every value seen anywhere, zero-filled.
pub fn daily_grid(records: &[ClassifiedRecord], dim: Dimension) -> BTreeMap<NaiveDate, Counts> {
    let columns: BTreeSet<&str> = records.iter().map(|r| dim.key(r)).collect();
    let mut grid: BTreeMap<NaiveDate, Counts> = distinct_dates(records)
        .into_iter()
        .map(|d| (d, columns.iter().map(|c| (c.to_string(), 0)).collect()))
        .collect();

    for r in records {
        if let Some(row) = grid.get_mut(&r.record.date()) {
            *row.entry(dim.key(r).to_string()).or_default() += 1;
        }
    }
    grid
}

/// Emotion shares of all records falling on each weekday (Monday = 0).
///
/// Records are pooled per weekday before normalizing, so busier days weigh
/// more and only emotions seen on that weekday appear. Empty unless the data
/// spans at least [`MIN_DAYS_FOR_WEEKLY`] distinct days.
pub fn weekly_emotional_patterns(records: &[ClassifiedRecord]) -> BTreeMap<u32, Ratios> {
    if distinct_dates(records).len() < MIN_DAYS_FOR_WEEKLY {
        return BTreeMap::new();
    }

    let mut by_weekday: BTreeMap<u32, Counts> = BTreeMap::new();
    for r in records {
        let weekday = r.record.date().weekday().num_days_from_monday();
        *by_weekday
            .entry(weekday)
            .or_default()
            .entry(r.emotion().to_string())
            .or_default() += 1;
    }

    by_weekday
        .into_iter()
        .map(|(weekday, counts)| (weekday, proportions(&counts)))
        .collect()
}

// =============================================================================
// Report sections
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentCategorization {
    pub topic_distribution: Counts,
    pub category_distribution: Counts,
    pub emotion_by_topic: BTreeMap<String, Counts>,
    pub emotion_by_category: BTreeMap<String, Counts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub emotion_frequency: Counts,
    pub emotion_distribution: Ratios,
    pub topic_frequency: Counts,
    pub category_frequency: Counts,
    pub humor_rate: f64,
    pub humor_by_topic: Ratios,
    pub humor_by_category: Ratios,
    pub political_content_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub daily_counts: BTreeMap<NaiveDate, usize>,
    pub emotion_trends: BTreeMap<NaiveDate, Counts>,
    pub topic_trends: BTreeMap<NaiveDate, Counts>,
    pub category_trends: BTreeMap<NaiveDate, Counts>,
    pub weekly_emotional_patterns: BTreeMap<u32, Ratios>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementInsights {
    pub humor_by_topics: Counts,
    pub humor_by_categories: Counts,
    pub emotional_intensity_by_topic: Ratios,
    pub emotional_intensity_by_category: Ratios,
    pub topic_diversity_score: f64,
    pub category_diversity_score: f64,
}

/// Everything the report and recommender need, computed in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub total_records: usize,
    pub content: ContentCategorization,
    pub key_metrics: KeyMetrics,
    pub trends: TrendAnalysis,
    pub engagement: EngagementInsights,
}

impl Aggregates {
    pub fn compute(records: &[ClassifiedRecord]) -> Self {
        let topic_frequency = frequency(records, Dimension::Topic);
        let category_frequency = frequency(records, Dimension::Category);
        let emotion_frequency = frequency(records, Dimension::Emotion);

        Self {
            total_records: records.len(),
            content: ContentCategorization {
                topic_distribution: topic_frequency.clone(),
                category_distribution: category_frequency.clone(),
                emotion_by_topic: emotion_by(records, Dimension::Topic),
                emotion_by_category: emotion_by(records, Dimension::Category),
            },
            key_metrics: KeyMetrics {
                emotion_distribution: proportions(&emotion_frequency),
                emotion_frequency,
                topic_frequency,
                category_frequency,
                humor_rate: humor_rate(records),
                humor_by_topic: humor_rate_by(records, Dimension::Topic),
                humor_by_category: humor_rate_by(records, Dimension::Category),
                political_content_ratio: political_ratio(records),
            },
            trends: TrendAnalysis {
                daily_counts: daily_counts(records),
                emotion_trends: daily_grid(records, Dimension::Emotion),
                topic_trends: daily_grid(records, Dimension::Topic),
                category_trends: daily_grid(records, Dimension::Category),
                weekly_emotional_patterns: weekly_emotional_patterns(records),
            },
            engagement: EngagementInsights {
                humor_by_topics: humorous_counts_by(records, Dimension::Topic),
                humor_by_categories: humorous_counts_by(records, Dimension::Category),
                emotional_intensity_by_topic: emotional_intensity_by(records, Dimension::Topic),
                emotional_intensity_by_category: emotional_intensity_by(
                    records,
                    Dimension::Category,
                ),
                topic_diversity_score: diversity_score(records, Dimension::Topic),
                category_diversity_score: diversity_score(records, Dimension::Category),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{classified, day, political, record};
    use feedlens_common::Category;

    fn sample() -> Vec<ClassifiedRecord> {
        vec![
            classified(record("AI tools", "joy", true, day(2024, 3, 4)), Category::Technology),
            classified(record("AI tools", "neutral", false, day(2024, 3, 4)), Category::Technology),
            classified(
                political(record("Taxes", "anger", false, day(2024, 3, 5)), "left"),
                Category::Politics,
            ),
            classified(record("Gym", "joy", true, day(2024, 3, 5)), Category::HealthWellness),
        ]
    }

    #[test]
    fn empty_input_is_zero() {
        let agg = Aggregates::compute(&[]);
        assert_eq!(agg, Aggregates::default());
        assert_eq!(agg.key_metrics.humor_rate, 0.0);
        assert_eq!(agg.engagement.topic_diversity_score, 0.0);
    }

    #[test]
    fn frequencies_and_proportions() {
        let records = sample();
        let agg = Aggregates::compute(&records);

        assert_eq!(agg.key_metrics.topic_frequency["AI tools"], 2);
        assert_eq!(agg.key_metrics.category_frequency["Technology"], 2);
        assert_eq!(agg.key_metrics.emotion_frequency["joy"], 2);
        assert_eq!(agg.key_metrics.emotion_distribution["joy"], 0.5);
        assert_eq!(agg.key_metrics.emotion_distribution["anger"], 0.25);

        let sum: f64 = agg.key_metrics.emotion_distribution.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rates() {
        let agg = Aggregates::compute(&sample());
        assert_eq!(agg.key_metrics.humor_rate, 0.5);
        assert_eq!(agg.key_metrics.political_content_ratio, 0.25);
        assert_eq!(agg.key_metrics.humor_by_topic["AI tools"], 0.5);
        assert_eq!(agg.key_metrics.humor_by_topic["Taxes"], 0.0);
        assert_eq!(agg.engagement.humor_by_topics.get("Taxes"), None);
        assert_eq!(agg.engagement.humor_by_categories["Health & Wellness"], 1);
        assert_eq!(agg.engagement.emotional_intensity_by_topic["AI tools"], 0.5);
        assert_eq!(agg.engagement.emotional_intensity_by_category["Politics"], 1.0);
        assert_eq!(agg.engagement.topic_diversity_score, 0.75);
    }

    #[test]
    fn emotion_cross_tab() {
        let agg = Aggregates::compute(&sample());
        let tech = &agg.content.emotion_by_category["Technology"];
        assert_eq!(tech["joy"], 1);
        assert_eq!(tech["neutral"], 1);
        assert_eq!(tech.get("anger"), None);
    }

    #[test]
    fn daily_grid_is_dense() {
        let agg = Aggregates::compute(&sample());
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let row = &agg.trends.topic_trends[&monday];
        assert_eq!(row.len(), 3);
        assert_eq!(row["Taxes"], 0);
        assert_eq!(row["AI tools"], 2);
        assert_eq!(agg.trends.daily_counts[&monday], 2);
    }

    #[test]
    fn weekly_patterns_need_seven_days() {
        let agg = Aggregates::compute(&sample());
        assert!(agg.trends.weekly_emotional_patterns.is_empty());

        // 2024-03-04 is a Monday; two Mondays in range.
        let records: Vec<_> = (4..=11)
            .map(|d| {
                let emotion = if d == 4 { "joy" } else { "neutral" };
                classified(record("t", emotion, false, day(2024, 3, d)), Category::Other)
            })
            .collect();
        let weekly = weekly_emotional_patterns(&records);
        assert_eq!(weekly.len(), 7);
        assert_eq!(weekly[&0]["joy"], 0.5);
        assert_eq!(weekly[&0]["neutral"], 0.5);
        assert_eq!(weekly[&6]["neutral"], 1.0);
        assert_eq!(weekly[&6].get("joy"), None);
    }

    #[test]
    fn weekly_patterns_weight_by_record() {
        // Monday 3/4 has one joy record, Monday 3/11 three neutral ones.
        let mut records = vec![classified(record("t", "joy", false, day(2024, 3, 4)), Category::Other)];
        for _ in 0..3 {
            records.push(classified(record("t", "neutral", false, day(2024, 3, 11)), Category::Other));
        }
        for d in 5..=9 {
            records.push(classified(record("t", "anger", false, day(2024, 3, d)), Category::Other));
        }

        let weekly = weekly_emotional_patterns(&records);
        let monday = &weekly[&0];
        assert_eq!(monday.len(), 2);
        assert_eq!(monday["joy"], 0.25);
        assert_eq!(monday["neutral"], 0.75);
        assert_eq!(monday.get("anger"), None);
        assert_eq!(weekly[&1]["anger"], 1.0);
    }
}
