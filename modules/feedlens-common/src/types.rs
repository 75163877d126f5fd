use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// --- Topic Categories ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Technology,
    Personal,
    Business,
    Entertainment,
    #[serde(rename = "Social Commentary")]
    SocialCommentary,
    #[serde(rename = "Health & Wellness")]
    HealthWellness,
    Education,
    Politics,
    Sports,
    Lifestyle,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Technology,
        Category::Personal,
        Category::Business,
        Category::Entertainment,
        Category::SocialCommentary,
        Category::HealthWellness,
        Category::Education,
        Category::Politics,
        Category::Sports,
        Category::Lifestyle,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Personal => "Personal",
            Category::Business => "Business",
            Category::Entertainment => "Entertainment",
            Category::SocialCommentary => "Social Commentary",
            Category::HealthWellness => "Health & Wellness",
            Category::Education => "Education",
            Category::Politics => "Politics",
            Category::Sports => "Sports",
            Category::Lifestyle => "Lifestyle",
            Category::Other => "Other",
        }
    }

    /// Match a label case-insensitively, ignoring surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// --- Political Alignment ---

/// Sentinel meaning "no political alignment".
pub const NO_ALIGNMENT: &str = "none";

/// Either a single label or a list of labels, as found in labelled post files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoliticalAlignment {
    Label(String),
    Labels(Vec<String>),
}

impl Default for PoliticalAlignment {
    fn default() -> Self {
        PoliticalAlignment::Label(NO_ALIGNMENT.to_string())
    }
}

impl PoliticalAlignment {
    /// True when the alignment normalizes to the "none" sentinel.
    /// An empty list or a list of only "none" labels counts as none.
    pub fn is_none(&self) -> bool {
        match self {
            PoliticalAlignment::Label(label) => is_none_label(label),
            PoliticalAlignment::Labels(labels) => labels.iter().all(|l| is_none_label(l)),
        }
    }
}

fn is_none_label(label: &str) -> bool {
    let label = label.trim();
    label.is_empty() || label.eq_ignore_ascii_case(NO_ALIGNMENT)
}

// --- Records ---

/// One labelled post as it appears in an input batch file.
///
/// `topic` and `emotion` are required; a post missing either is quarantined
/// by ingestion. `humor` defaults to false, `political_alignment` to "none".
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPost {
    pub topic: String,
    pub emotion: String,
    #[serde(default)]
    pub humor: bool,
    #[serde(default)]
    pub political_alignment: Option<PoliticalAlignment>,
}

/// One ingested post, stamped with the timestamp of its batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub topic: String,
    pub emotion: String,
    pub humor: bool,
    pub political_alignment: PoliticalAlignment,
    pub timestamp: NaiveDateTime,
}

impl Record {
    pub fn from_raw(raw: RawPost, timestamp: NaiveDateTime) -> Self {
        Self {
            topic: raw.topic,
            emotion: raw.emotion,
            humor: raw.humor,
            political_alignment: raw.political_alignment.unwrap_or_default(),
            timestamp,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn is_political(&self) -> bool {
        !self.political_alignment.is_none()
    }
}

// --- Scraped Posts ---

/// A post as displayed on the feed page. Counts are kept as shown ("1.2K").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPost {
    pub text: String,
    pub timestamp: String,
    pub likes: String,
    pub retweets: String,
}
