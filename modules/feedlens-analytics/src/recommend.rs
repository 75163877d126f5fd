use std::cmp::Ordering;

use serde::Serialize;

use crate::aggregate::{Aggregates, Ratios};

pub const LOW_HUMOR_RATE: f64 = 0.2;
pub const HIGH_NEUTRAL_SHARE: f64 = 0.7;
pub const LOW_TOPIC_DIVERSITY: f64 = 0.1;
pub const TOP_EMOTIONAL: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendations {
    pub recommendations: Vec<String>,
    pub top_emotional_topics: Vec<(String, f64)>,
    pub top_emotional_categories: Vec<(String, f64)>,
}

/// Highest value first; equal values by ascending key.
fn by_value_desc(a: &(&String, &f64), b: &(&String, &f64)) -> Ordering {
    b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0))
}

fn top_n(ratios: &Ratios, n: usize) -> Vec<(String, f64)> {
    let mut entries: Vec<_> = ratios.iter().collect();
    entries.sort_by(by_value_desc);
    entries
        .into_iter()
        .take(n)
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

/// Apply the rule set to computed aggregates. Rules are independent and all
/// evaluated; an empty dataset yields no recommendations.
pub fn recommend(agg: &Aggregates) -> Recommendations {
    let mut out = Recommendations {
        top_emotional_topics: top_n(&agg.engagement.emotional_intensity_by_topic, TOP_EMOTIONAL),
        top_emotional_categories: top_n(
            &agg.engagement.emotional_intensity_by_category,
            TOP_EMOTIONAL,
        ),
        ..Default::default()
    };

    if agg.total_records == 0 {
        return out;
    }

    let metrics = &agg.key_metrics;

    if metrics.humor_rate < LOW_HUMOR_RATE {
        out.recommendations
            .push("Consider adding more humor - current rate is low".to_string());
    }

    let neutral = metrics.emotion_distribution.get("neutral").copied().unwrap_or(0.0);
    if neutral > HIGH_NEUTRAL_SHARE {
        out.recommendations
            .push("Content is heavily neutral - consider more emotional engagement".to_string());
    }

    if agg.engagement.topic_diversity_score < LOW_TOPIC_DIVERSITY {
        out.recommendations
            .push("Consider diversifying topics for broader appeal".to_string());
    }

    // Only categories with at least one humorous record compete.
    let funniest = agg
        .engagement
        .humor_by_categories
        .keys()
        .filter_map(|cat| metrics.humor_by_category.get_key_value(cat))
        .min_by(by_value_desc);
    if let Some((category, _)) = funniest {
        out.recommendations.push(format!(
            "'{category}' category works well with humor - consider similar content"
        ));
    }

    let dominant = metrics
        .category_frequency
        .iter()
        .min_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    if let Some((category, _)) = dominant {
        out.recommendations.push(format!(
            "Most content falls under '{category}' - consider balancing with other categories"
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{classified, day, record};
    use feedlens_common::Category;

    #[test]
    fn empty_dataset_has_no_recommendations() {
        let recs = recommend(&Aggregates::default());
        assert!(recs.recommendations.is_empty());
        assert!(recs.top_emotional_topics.is_empty());
    }

    #[test]
    fn all_neutral_single_topic() {
        let records: Vec<_> = (0..20)
            .map(|_| classified(record("AI tools", "neutral", false, day(2024, 3, 4)), Category::Technology))
            .collect();
        let recs = recommend(&Aggregates::compute(&records));
        assert_eq!(
            recs.recommendations,
            vec![
                "Consider adding more humor - current rate is low",
                "Content is heavily neutral - consider more emotional engagement",
                "Consider diversifying topics for broader appeal",
                "Most content falls under 'Technology' - consider balancing with other categories",
            ]
        );
    }

    #[test]
    fn funniest_category_needs_a_humorous_record() {
        let records = vec![
            classified(record("Memes", "joy", true, day(2024, 3, 4)), Category::Entertainment),
            classified(record("Memes", "joy", false, day(2024, 3, 4)), Category::Entertainment),
            classified(record("Jokes", "joy", true, day(2024, 3, 4)), Category::Personal),
            classified(record("Taxes", "anger", false, day(2024, 3, 4)), Category::Politics),
        ];
        let recs = recommend(&Aggregates::compute(&records));
        assert!(recs
            .recommendations
            .contains(&"'Personal' category works well with humor - consider similar content".to_string()));
        assert!(recs
            .recommendations
            .contains(&"Most content falls under 'Entertainment' - consider balancing with other categories".to_string()));
    }

    #[test]
    fn ties_break_by_name() {
        let records = vec![
            classified(record("b", "anger", true, day(2024, 3, 4)), Category::Sports),
            classified(record("a", "joy", true, day(2024, 3, 4)), Category::Business),
            classified(record("c", "sadness", false, day(2024, 3, 4)), Category::Other),
            classified(record("d", "neutral", false, day(2024, 3, 4)), Category::Other),
        ];
        let recs = recommend(&Aggregates::compute(&records));

        let topics: Vec<_> = recs.top_emotional_topics.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(topics, vec!["a", "b", "c"]);
        assert!(recs
            .recommendations
            .contains(&"'Business' category works well with humor - consider similar content".to_string()));
        assert!(recs
            .recommendations
            .contains(&"Most content falls under 'Other' - consider balancing with other categories".to_string()));
    }
}
