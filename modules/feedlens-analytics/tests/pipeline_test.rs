//! End-to-end analysis runs over a temporary data directory.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use feedlens_analytics::aggregate::{Aggregates, Dimension};
use feedlens_analytics::classify::{apply_categories, distinct_topics};
use feedlens_analytics::report::REPORT_FILE;
use feedlens_analytics::testing::{classified, day, political, record, write_batch, ScriptedCompletion};
use feedlens_analytics::{
    run, Classifier, KeywordClassifier, RemoteClassifier, TopicClassifier, VegaLiteRenderer,
    WriteOutcome,
};
use feedlens_common::{Category, Record};

const MONDAY: &str = r#"[
    {"topic": "AI coding assistants", "emotion": "joy", "humor": true, "political_alignment": "none"},
    {"topic": "Freelance pricing", "emotion": "neutral", "humor": false, "political_alignment": ["none"]},
    {"topic": "Tax policy", "emotion": "anger", "humor": false, "political_alignment": "left"},
    {"topic": "Spam", "emotion": "neutral", "skip": true}
]"#;

const TUESDAY: &str = r#"[
    {"topic": "Mental health", "emotion": "sadness", "humor": false},
    {"topic": "AI coding assistants", "emotion": "neutral", "humor": true},
    {"emotion": "joy"}
]"#;

fn read_report(outcome: &WriteOutcome) -> Value {
    serde_json::from_str(&std::fs::read_to_string(outcome.path()).unwrap()).unwrap()
}

#[tokio::test]
async fn local_run_writes_report_and_charts() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_batch(data.path(), "posts_2024-03-04.json", MONDAY);
    write_batch(data.path(), "posts_2024_03_05.json", TUESDAY);
    write_batch(data.path(), "broken_2024-03-06.json", "{not json");

    let output_dir = out.path().join("2024-03-07_12-00-00");
    let run = run(
        &KeywordClassifier,
        &VegaLiteRenderer,
        data.path(),
        &output_dir,
        day(2024, 3, 7),
    )
    .await
    .unwrap();

    assert_eq!(run.classifier, "local");
    assert_eq!(run.ingest.files_read, 2);
    assert_eq!(run.ingest.files_skipped, 1);
    assert_eq!(run.ingest.records_loaded, 5);
    assert_eq!(run.ingest.records_skipped, 1);
    assert_eq!(run.ingest.records_quarantined, 1);

    let outcome = run.report_file.clone().unwrap();
    assert_eq!(outcome, WriteOutcome::Full(output_dir.join(REPORT_FILE)));

    let json = read_report(&outcome);
    assert_eq!(json["summary"]["total_records"], 5);
    assert_eq!(json["summary"]["date_range"]["start"], "2024-03-04");
    assert_eq!(json["summary"]["date_range"]["end"], "2024-03-05");
    assert_eq!(json["key_metrics"]["category_frequency"]["Technology"], 2);
    assert_eq!(json["key_metrics"]["political_content_ratio"], 0.2);
    assert_eq!(json["key_metrics"]["humor_rate"], 0.4);
    assert_eq!(json["trend_analysis"]["daily_counts"]["2024-03-04"], 3);
    assert!(json["trend_analysis"]["weekly_emotional_patterns"]
        .as_object()
        .unwrap()
        .is_empty());

    let chart_names: BTreeSet<String> = run
        .charts
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        chart_names,
        [
            "emotion_distribution.vl.json",
            "topics_and_categories.vl.json",
            "emotion_category_heatmap.vl.json",
            "time_series_analysis.vl.json",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    );
}

#[tokio::test]
async fn empty_data_dir_still_writes_valid_report() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let output_dir = out.path().join("run");

    let run = run(
        &KeywordClassifier,
        &VegaLiteRenderer,
        data.path(),
        &output_dir,
        day(2024, 3, 7),
    )
    .await
    .unwrap();

    assert!(run.charts.is_empty());
    let json = read_report(run.report_file.as_ref().unwrap());
    assert_eq!(json["summary"]["total_records"], 0);
    assert_eq!(json["summary"]["date_range"], Value::Null);
    assert_eq!(json["key_metrics"]["humor_rate"], 0.0);
    assert_eq!(json["engagement_insights"]["topic_diversity_score"], 0.0);
    assert!(json["actionable_insights"]["recommendations"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn remote_classifier_used_once_per_run() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_batch(data.path(), "2024-03-04.json", MONDAY);

    let backend = Arc::new(ScriptedCompletion::replying(
        r#"{"AI coding assistants": "Technology", "Freelance pricing": "Business", "Tax policy": "Politics"}"#,
    ));
    let classifier = Classifier::Remote(RemoteClassifier::new(backend.clone()));

    let run = run(&classifier, &VegaLiteRenderer, data.path(), &out.path().join("r"), day(2024, 3, 7))
        .await
        .unwrap();

    assert_eq!(backend.calls(), 1);
    assert!(backend.prompts()[0].contains("- Tax policy\n"));
    assert_eq!(run.report.key_metrics.category_frequency["Politics"], 1);
}

#[tokio::test]
async fn remote_outage_matches_local_result() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_batch(data.path(), "2024-03-04.json", MONDAY);
    write_batch(data.path(), "2024-03-05.json", TUESDAY);

    let failing = Classifier::Remote(RemoteClassifier::new(Arc::new(ScriptedCompletion::failing(
        "connection refused",
    ))));
    let remote = run(&failing, &VegaLiteRenderer, data.path(), &out.path().join("a"), day(2024, 3, 7))
        .await
        .unwrap();
    let local = run(&KeywordClassifier, &VegaLiteRenderer, data.path(), &out.path().join("b"), day(2024, 3, 7))
        .await
        .unwrap();

    assert_eq!(remote.report.key_metrics, local.report.key_metrics);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn sample_records() -> Vec<Record> {
    vec![
        record("AI coding assistants", "joy", true, day(2024, 3, 4)),
        record("Freelance pricing", "neutral", false, day(2024, 3, 4)),
        record("Tax policy", "anger", false, day(2024, 3, 5)),
        record("Gardening", "joy", false, day(2024, 3, 6)),
        record("AI coding assistants", "neutral", false, day(2024, 3, 6)),
    ]
}

#[tokio::test]
async fn every_topic_gets_exactly_one_category() {
    let records = sample_records();
    let topics = distinct_topics(&records);
    let map = KeywordClassifier.classify(&topics).await;

    assert_eq!(map.keys().cloned().collect::<BTreeSet<_>>(), topics);
    assert!(map.values().all(|c| Category::ALL.contains(c)));
    assert_eq!(map, KeywordClassifier.classify(&topics).await);
}

#[tokio::test]
async fn frequency_sums_equal_record_count() {
    let records = sample_records();
    let map = KeywordClassifier.classify(&distinct_topics(&records)).await;
    let classified = apply_categories(records, &map);
    let agg = Aggregates::compute(&classified);

    for counts in [
        &agg.key_metrics.topic_frequency,
        &agg.key_metrics.category_frequency,
        &agg.key_metrics.emotion_frequency,
    ] {
        assert_eq!(counts.values().sum::<usize>(), classified.len());
    }
}

#[test]
fn political_ratio_extremes() {
    let none: Vec<_> = (0..4)
        .map(|i| {
            let r = record("t", "joy", false, day(2024, 3, 4));
            let r = if i % 2 == 0 { political(r, "none") } else { r };
            classified(r, Category::Other)
        })
        .collect();
    let mut listed = record("t", "joy", false, day(2024, 3, 4));
    listed.political_alignment = serde_json::from_str(r#"["none"]"#).unwrap();
    let mut none = none;
    none.push(classified(listed, Category::Other));
    assert_eq!(Aggregates::compute(&none).key_metrics.political_content_ratio, 0.0);

    let all: Vec<_> = ["left", "right", "center"]
        .iter()
        .map(|label| classified(political(record("t", "joy", false, day(2024, 3, 4)), label), Category::Politics))
        .collect();
    assert_eq!(Aggregates::compute(&all).key_metrics.political_content_ratio, 1.0);
}

#[test]
fn humor_rate_three_in_ten() {
    let records: Vec<_> = (0..10)
        .map(|i| classified(record("t", "joy", i < 3, day(2024, 3, 4)), Category::Other))
        .collect();
    assert!((Aggregates::compute(&records).key_metrics.humor_rate - 0.3).abs() < 1e-12);
}

#[test]
fn diversity_bounds() {
    let distinct: Vec<_> = (0..5)
        .map(|i| classified(record(&format!("topic {i}"), "joy", false, day(2024, 3, 4)), Category::Other))
        .collect();
    assert_eq!(
        feedlens_analytics::aggregate::diversity_score(&distinct, Dimension::Topic),
        1.0
    );

    let same: Vec<_> = (0..5)
        .map(|_| classified(record("topic", "joy", false, day(2024, 3, 4)), Category::Other))
        .collect();
    assert!((feedlens_analytics::aggregate::diversity_score(&same, Dimension::Topic) - 0.2).abs() < 1e-12);
}
