use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use ai_client::util::{preview, strip_code_blocks};
use ai_client::{CompletionOptions, JsonCompletion, Message};
use feedlens_common::{Category, Record};

/// Topic → category assignment for every distinct topic in a dataset.
pub type CategoryMap = BTreeMap<String, Category>;

/// Maps distinct topic strings to categories. Never fails: strategies that
/// depend on a remote service degrade to keyword rules internally.
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    async fn classify(&self, topics: &BTreeSet<String>) -> CategoryMap;

    fn name(&self) -> &'static str;
}

// =============================================================================
// Keyword rules
// =============================================================================

/// Ordered keyword table. The first category with a keyword contained in the
/// lowercased topic wins.
const KEYWORD_RULES: &[(Category, &[&str])] = &[
    (
        Category::Technology,
        &[
            "software", "tech", "developer", "coding", "programming", "security", "ai",
            "digital", "iphone", "earbud", "battery", "internet",
        ],
    ),
    (
        Category::Personal,
        &[
            "family", "personal", "autism", "career", "gratitude", "milestone",
            "encouragement",
        ],
    ),
    (
        Category::Business,
        &["freelance", "pricing", "economic", "service", "commercial", "satellite"],
    ),
    (
        Category::Entertainment,
        &["satire", "hype", "nostalgia", "humor"],
    ),
    (
        Category::SocialCommentary,
        &["industry", "comparison", "complaint", "commentary"],
    ),
    (Category::HealthWellness, &["wellness", "health", "mental"]),
    (Category::Lifestyle, &["lifestyle", "daily", "routine"]),
];

/// Deterministic substring rules. Also the fallback for the remote strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn categorize(&self, topic: &str) -> Category {
        let topic = topic.to_lowercase();
        KEYWORD_RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| topic.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::Other)
    }

    pub fn classify_all(&self, topics: &BTreeSet<String>) -> CategoryMap {
        topics
            .iter()
            .map(|t| (t.clone(), self.categorize(t)))
            .collect()
    }
}

#[async_trait]
impl TopicClassifier for KeywordClassifier {
    async fn classify(&self, topics: &BTreeSet<String>) -> CategoryMap {
        self.classify_all(topics)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

// =============================================================================
// Remote classification
// =============================================================================

/// Build the single batched categorization prompt.
pub fn build_prompt(topics: &BTreeSet<String>) -> String {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
    let listing: String = topics.iter().map(|t| format!("- {t}\n")).collect();
    format!(
        "Categorize the following tweet topics into general categories. \
         Return a JSON object where each topic is mapped to one of these categories: {}.\n\n\
         Topics:\n{listing}",
        labels.join(", ")
    )
}

/// Sends every distinct topic to a chat completion service in one request.
pub struct RemoteClassifier {
    backend: Arc<dyn JsonCompletion>,
    options: CompletionOptions,
    fallback: KeywordClassifier,
}

impl RemoteClassifier {
    pub fn new(backend: Arc<dyn JsonCompletion>) -> Self {
        Self {
            backend,
            options: CompletionOptions::default(),
            fallback: KeywordClassifier,
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    async fn request(&self, topics: &BTreeSet<String>) -> Result<CategoryMap> {
        let messages = vec![Message::user(build_prompt(topics))];
        let content = self
            .backend
            .complete_json(messages, self.options)
            .await
            .context("Classification request failed")?;

        let parsed: BTreeMap<String, Value> = serde_json::from_str(strip_code_blocks(&content))
            .with_context(|| {
                format!("Classifier reply is not a JSON object: {}", preview(&content, 200))
            })?;

        Ok(self.resolve(topics, &parsed))
    }

    /// Reconcile a reply with the requested topics. Unknown labels become
    /// Other; topics the reply omits get keyword rules.
    fn resolve(&self, topics: &BTreeSet<String>, reply: &BTreeMap<String, Value>) -> CategoryMap {
        let mut map = CategoryMap::new();
        for topic in topics {
            let label = reply.get(topic).or_else(|| {
                reply
                    .iter()
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case(topic.trim()))
                    .map(|(_, v)| v)
            });

            let category = match label {
                Some(value) => match value.as_str().and_then(Category::from_label) {
                    Some(category) => category,
                    None => {
                        debug!(%topic, label = %value, "Unrecognized category label, using Other");
                        Category::Other
                    }
                },
                None => {
                    let category = self.fallback.categorize(topic);
                    debug!(%topic, %category, "Topic missing from classifier reply, using keyword rules");
                    category
                }
            };
            map.insert(topic.clone(), category);
        }
        map
    }
}

#[async_trait]
impl TopicClassifier for RemoteClassifier {
    async fn classify(&self, topics: &BTreeSet<String>) -> CategoryMap {
        if topics.is_empty() {
            return CategoryMap::new();
        }

        match self.request(topics).await {
            Ok(map) => {
                info!(topics = map.len(), "Categorized topics remotely");
                map
            }
            Err(e) => {
                let error = format!("{e:#}");
                warn!(%error, "Remote classification failed, falling back to keyword rules");
                self.fallback.classify_all(topics)
            }
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

// =============================================================================
// Strategy selection
// =============================================================================

/// The strategy chosen at startup.
pub enum Classifier {
    Remote(RemoteClassifier),
    Local(KeywordClassifier),
}

impl Classifier {
    /// Remote when a backend is available, keyword rules otherwise.
    pub fn remote_or_local(backend: Option<Arc<dyn JsonCompletion>>, options: CompletionOptions) -> Self {
        match backend {
            Some(backend) => Classifier::Remote(RemoteClassifier::new(backend).with_options(options)),
            None => {
                warn!("No classification API key configured, using keyword rules");
                Classifier::Local(KeywordClassifier)
            }
        }
    }
}

#[async_trait]
impl TopicClassifier for Classifier {
    async fn classify(&self, topics: &BTreeSet<String>) -> CategoryMap {
        match self {
            Classifier::Remote(c) => c.classify(topics).await,
            Classifier::Local(c) => c.classify(topics).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Classifier::Remote(c) => c.name(),
            Classifier::Local(c) => c.name(),
        }
    }
}

// =============================================================================
// Applying categories
// =============================================================================

/// A record with its derived category.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub category: Category,
}

impl ClassifiedRecord {
    pub fn topic(&self) -> &str {
        &self.record.topic
    }

    pub fn emotion(&self) -> &str {
        &self.record.emotion
    }

    pub fn category_label(&self) -> &str {
        self.category.label()
    }
}

pub fn distinct_topics(records: &[Record]) -> BTreeSet<String> {
    records.iter().map(|r| r.topic.clone()).collect()
}

/// Attach a category to every record. Topics absent from the map are Other.
pub fn apply_categories(records: Vec<Record>, map: &CategoryMap) -> Vec<ClassifiedRecord> {
    records
        .into_iter()
        .map(|record| {
            let category = map.get(&record.topic).copied().unwrap_or(Category::Other);
            ClassifiedRecord { record, category }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompletion;

    fn topics(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keyword_first_match_wins() {
        let k = KeywordClassifier;
        assert_eq!(k.categorize("AI Security Tips"), Category::Technology);
        assert_eq!(k.categorize("Family career milestone"), Category::Personal);
        assert_eq!(k.categorize("Freelance pricing"), Category::Business);
        assert_eq!(k.categorize("Mental health day"), Category::HealthWellness);
        assert_eq!(k.categorize("Morning routine"), Category::Lifestyle);
        assert_eq!(k.categorize("Cooking pasta"), Category::Other);
        // "tech" matches before "commentary" is ever considered.
        assert_eq!(k.categorize("Tech industry commentary"), Category::Technology);
    }

    #[test]
    fn keyword_matches_inside_words() {
        // Substring semantics: "ai" appears inside "daily".
        assert_eq!(KeywordClassifier.categorize("Daily walk"), Category::Technology);
    }

    #[test]
    fn prompt_lists_topics_and_labels() {
        let prompt = build_prompt(&topics(&["AI tools", "Coffee"]));
        assert!(prompt.contains("- AI tools\n"));
        assert!(prompt.contains("- Coffee\n"));
        assert!(prompt.contains("Health & Wellness"));
        assert!(prompt.contains("JSON object"));
    }

    #[tokio::test]
    async fn remote_reply_is_applied() {
        let backend = Arc::new(ScriptedCompletion::replying(
            r#"{"AI tools": "Technology", "Coffee": "lifestyle"}"#,
        ));
        let classifier = RemoteClassifier::new(backend.clone());
        let map = classifier.classify(&topics(&["AI tools", "Coffee"])).await;

        assert_eq!(map["AI tools"], Category::Technology);
        assert_eq!(map["Coffee"], Category::Lifestyle);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn remote_unknown_label_becomes_other_and_missing_topic_uses_keywords() {
        let backend = Arc::new(ScriptedCompletion::replying(
            "```json\n{\"Coffee\": \"Beverages\"}\n```",
        ));
        let classifier = RemoteClassifier::new(backend);
        let map = classifier
            .classify(&topics(&["Coffee", "Mental health"]))
            .await;

        assert_eq!(map["Coffee"], Category::Other);
        assert_eq!(map["Mental health"], Category::HealthWellness);
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_keywords() {
        let backend = Arc::new(ScriptedCompletion::failing("429 Too Many Requests"));
        let classifier = RemoteClassifier::new(backend);
        let set = topics(&["Software bugs", "Gardening"]);
        let map = classifier.classify(&set).await;

        assert_eq!(map, KeywordClassifier.classify_all(&set));
    }

    #[tokio::test]
    async fn remote_non_object_reply_falls_back() {
        let backend = Arc::new(ScriptedCompletion::replying(r#"["Technology"]"#));
        let classifier = RemoteClassifier::new(backend);
        let map = classifier.classify(&topics(&["Software bugs"])).await;
        assert_eq!(map["Software bugs"], Category::Technology);
    }

    #[tokio::test]
    async fn remote_skips_request_for_no_topics() {
        let backend = Arc::new(ScriptedCompletion::replying("{}"));
        let classifier = RemoteClassifier::new(backend.clone());
        assert!(classifier.classify(&BTreeSet::new()).await.is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn missing_backend_selects_local() {
        let classifier = Classifier::remote_or_local(None, CompletionOptions::default());
        assert_eq!(classifier.name(), "local");
    }
}
