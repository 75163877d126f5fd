use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{FeedlensError, Result};

const DEFAULT_CLASSIFIER_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_CLASSIFIER_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

// =============================================================================
// Environment configuration (secrets, endpoints)
// =============================================================================

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; tunables live in the TOML FileConfig.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Classification
    pub api_key: Option<String>,
    pub classifier_url: String,
    pub classifier_model: String,

    // Scraping
    pub twitter_username: Option<String>,
    pub twitter_password: Option<String>,
    pub webdriver_url: String,
    pub webdriver_token: Option<String>,
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        config.log_keys();
        config
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_key: get("FEEDLENS_API_KEY").or_else(|| get("GROQ_API_KEY")),
            classifier_url: get("FEEDLENS_CLASSIFIER_URL")
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string()),
            classifier_model: get("FEEDLENS_CLASSIFIER_MODEL")
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_MODEL.to_string()),
            twitter_username: get("TWITTER_USERNAME"),
            twitter_password: get("TWITTER_PASSWORD"),
            webdriver_url: get("WEBDRIVER_URL").unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            webdriver_token: get("WEBDRIVER_TOKEN"),
        }
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) => {
                    let n = v.chars().count().min(4);
                    let head: String = v.chars().take(n).collect();
                    format!("{head}...({} chars)", v.len())
                }
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  API key: {}", preview_opt(&self.api_key));
        tracing::info!("  FEEDLENS_CLASSIFIER_URL: {}", self.classifier_url);
        tracing::info!("  FEEDLENS_CLASSIFIER_MODEL: {}", self.classifier_model);
        tracing::info!("  TWITTER_USERNAME: {}", preview_opt(&self.twitter_username));
        tracing::info!(
            "  TWITTER_PASSWORD: {}",
            if self.twitter_password.is_some() { "<set>" } else { "<not set>" }
        );
        tracing::info!("  WEBDRIVER_URL: {}", self.webdriver_url);
    }
}

// =============================================================================
// File configuration (tunables)
// =============================================================================

/// Which classification strategy to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Remote,
    Local,
}

impl std::str::FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(ClassifierKind::Remote),
            "local" => Ok(ClassifierKind::Local),
            other => Err(format!("unknown classifier '{other}', expected 'remote' or 'local'")),
        }
    }
}

/// Output format for chart files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartFormat {
    #[default]
    Png,
    VegaLite,
}

impl std::str::FromStr for ChartFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ChartFormat::Png),
            "vega-lite" => Ok(ChartFormat::VegaLite),
            other => Err(format!("unknown chart format '{other}', expected 'png' or 'vega-lite'")),
        }
    }
}

/// TOML-backed configuration. Every section and field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AnalyticsConfig {
    pub data_dir: PathBuf,
    pub output_root: PathBuf,
    pub classifier: ClassifierKind,
    pub chart_format: ChartFormat,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("analysis_results"),
            output_root: PathBuf::from("visualizations"),
            classifier: ClassifierKind::Remote,
            chart_format: ChartFormat::Png,
            max_tokens: 2048,
            temperature: 0.3,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScraperConfig {
    pub login_url: String,
    pub max_posts: usize,
    pub timeout_secs: u64,
    pub request_delay_ms: u64,
    pub output: PathBuf,
    pub headless: bool,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub selectors: SelectorConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            login_url: "https://x.com/login".to_string(),
            max_posts: 10,
            timeout_secs: 30,
            request_delay_ms: 3000,
            output: PathBuf::from("tweets.json"),
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_width: 1920,
            window_height: 1080,
            username: None,
            password: None,
            selectors: SelectorConfig::default(),
        }
    }
}

/// Page selectors. Values starting with `//` or `xpath:` are XPath, anything else CSS.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SelectorConfig {
    pub username_input: String,
    pub next_button: String,
    pub password_input: String,
    pub login_button: String,
    pub post: String,
    pub post_text: String,
    pub post_time: String,
    pub post_likes: String,
    pub post_retweets: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            username_input: r#"input[autocomplete="username"]"#.to_string(),
            next_button: "//div[@role='button'][.//span[text()='Next']]".to_string(),
            password_input: r#"input[type="password"]"#.to_string(),
            login_button: "//div[@role='button'][.//span[text()='Log in']]".to_string(),
            post: r#"article[data-testid="tweet"]"#.to_string(),
            post_text: r#"div[data-testid="tweetText"]"#.to_string(),
            post_time: "time".to_string(),
            post_likes: r#"div[data-testid="like"]"#.to_string(),
            post_retweets: r#"div[data-testid="retweet"]"#.to_string(),
        }
    }
}

impl FileConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeedlensError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| FeedlensError::Config(format!("{} ({})", e, path.display())))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FeedlensError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
