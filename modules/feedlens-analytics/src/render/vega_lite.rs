use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::{json, Value};

use feedlens_common::Result;

use super::{Chart, ChartData, ChartRenderer, Series, TOP_TOPICS};

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Writes each chart as a standalone `<name>.vl.json` Vega-Lite spec.
#[derive(Debug, Clone, Copy, Default)]
pub struct VegaLiteRenderer;

impl ChartRenderer for VegaLiteRenderer {
    fn render(&self, chart: &Chart, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.vl.json", chart.name));
        std::fs::write(&path, serde_json::to_string_pretty(&vega_lite_spec(chart))?)?;
        Ok(path)
    }
}

/// Self-contained Vega-Lite v5 document for one chart.
pub fn vega_lite_spec(chart: &Chart) -> Value {
    let mut spec = match &chart.data {
        ChartData::Emotions { bars } => emotions(bars),
        ChartData::TopicsAndCategories { topics, categories } => {
            topics_and_categories(topics, categories)
        }
        ChartData::Heatmap {
            rows,
            columns,
            cells,
        } => heatmap(rows, columns, cells),
        ChartData::TimeSeries {
            volume,
            emotions,
            categories,
        } => time_series(volume, emotions, categories),
    };
    if let Some(obj) = spec.as_object_mut() {
        obj.insert("$schema".into(), json!(VEGA_LITE_SCHEMA));
        obj.entry("title").or_insert_with(|| json!(chart.title));
    }
    spec
}

fn emotions(bars: &[(String, usize)]) -> Value {
    let values: Vec<Value> = bars
        .iter()
        .map(|(emotion, count)| json!({ "emotion": emotion, "count": count }))
        .collect();

    json!({
        "data": { "values": values },
        "mark": "bar",
        "encoding": {
            "x": { "field": "emotion", "type": "nominal", "sort": "-y", "axis": { "labelAngle": -45 } },
            "y": { "field": "count", "type": "quantitative", "title": "Count" }
        }
    })
}

fn topics_and_categories(topics: &[(String, usize)], categories: &[(String, usize)]) -> Value {
    let topics: Vec<Value> = topics
        .iter()
        .map(|(topic, count)| json!({ "topic": topic, "count": count }))
        .collect();
    let categories: Vec<Value> = categories
        .iter()
        .map(|(category, count)| json!({ "category": category, "count": count }))
        .collect();

    json!({
        "hconcat": [
            {
                "title": format!("Top {TOP_TOPICS} Topics"),
                "data": { "values": topics },
                "mark": "bar",
                "encoding": {
                    "y": { "field": "topic", "type": "nominal", "sort": "-x", "title": null },
                    "x": { "field": "count", "type": "quantitative", "title": "Count" }
                }
            },
            {
                "title": "Category Distribution",
                "data": { "values": categories },
                "mark": { "type": "arc", "tooltip": true },
                "encoding": {
                    "theta": { "field": "count", "type": "quantitative", "stack": "normalize" },
                    "color": { "field": "category", "type": "nominal" }
                }
            }
        ]
    })
}

fn heatmap(rows: &[String], columns: &[String], cells: &[Vec<usize>]) -> Value {
    let mut values = Vec::new();
    for (category, row) in rows.iter().zip(cells) {
        for (emotion, count) in columns.iter().zip(row) {
            values.push(json!({ "category": category, "emotion": emotion, "count": count }));
        }
    }

    json!({
        "data": { "values": values },
        "encoding": {
            "x": { "field": "emotion", "type": "nominal" },
            "y": { "field": "category", "type": "nominal" }
        },
        "layer": [
            {
                "mark": "rect",
                "encoding": { "color": { "field": "count", "type": "quantitative", "scale": { "scheme": "yelloworangered" } } }
            },
            {
                "mark": "text",
                "encoding": { "text": { "field": "count", "type": "quantitative" } }
            }
        ]
    })
}

fn time_series(volume: &[(NaiveDate, usize)], emotions: &[Series], categories: &[Series]) -> Value {
    let flatten = |lines: &[Series], field: &str| -> Vec<Value> {
        lines
            .iter()
            .flat_map(|s| {
                s.points
                    .iter()
                    .map(move |(date, count)| json!({ "date": date, field: s.name, "count": count }))
            })
            .collect()
    };

    let line = |title: &str, values: Vec<Value>, color: Option<&str>| {
        let mut encoding = json!({
            "x": { "field": "date", "type": "temporal", "title": "Date" },
            "y": { "field": "count", "type": "quantitative", "title": "Count" }
        });
        if let (Some(field), Some(obj)) = (color, encoding.as_object_mut()) {
            obj.insert("color".into(), json!({ "field": field, "type": "nominal" }));
        }
        json!({
            "title": title,
            "data": { "values": values },
            "mark": { "type": "line", "point": true },
            "encoding": encoding
        })
    };

    let volume: Vec<Value> = volume
        .iter()
        .map(|(date, count)| json!({ "date": date, "count": count }))
        .collect();

    json!({
        "vconcat": [
            line("Daily Volume", volume, None),
            line("Emotion Trends", flatten(emotions, "emotion"), Some("emotion")),
            line("Category Trends", flatten(categories, "category"), Some("category"))
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregates;
    use crate::render::{plan_charts, render_all};
    use crate::testing::{classified, day, record};
    use feedlens_common::Category;

    #[test]
    fn heatmap_spec_is_dense() {
        let records = vec![
            classified(record("a", "joy", false, day(2024, 3, 4)), Category::Other),
            classified(record("b", "anger", false, day(2024, 3, 4)), Category::Sports),
        ];
        let charts = plan_charts(&Aggregates::compute(&records));
        let spec = vega_lite_spec(&charts[2]);
        assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 4);
        assert_eq!(spec["title"], "Emotions by Category");
    }

    #[test]
    fn writes_vl_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![classified(record("t", "joy", false, day(2024, 3, 4)), Category::Other)];
        let charts = plan_charts(&Aggregates::compute(&records));
        let written = render_all(&VegaLiteRenderer, &charts, dir.path());

        assert_eq!(written.len(), 2);
        assert!(dir.path().join("emotion_distribution.vl.json").exists());
        let spec: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("topics_and_categories.vl.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(spec["$schema"], VEGA_LITE_SCHEMA);
        assert_eq!(spec["hconcat"][0]["data"]["values"][0]["topic"], "t");
    }
}
