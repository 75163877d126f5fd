// The page-interaction surface the spider depends on.
//
// WebDriverPage drives a real browser; FakePage (testing.rs) serves canned
// elements so extraction logic runs without one.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use feedlens_common::config::SelectorConfig;

/// An element selector. XPath when written as `//...`, `(//...)` or
/// `xpath:...`, CSS otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(expr) = raw.strip_prefix("xpath:") {
            Selector::XPath(expr.trim().to_string())
        } else if raw.starts_with("//") || raw.starts_with("(//") {
            Selector::XPath(raw.to_string())
        } else {
            Selector::Css(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Selector::Css(s) | Selector::XPath(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css={s}"),
            Selector::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Opaque handle to an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

#[async_trait]
pub trait Page: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Resolve once `selector` matches, or fail after `timeout`.
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<()>;

    async fn fill(&self, selector: &Selector, text: &str) -> Result<()>;

    async fn click(&self, selector: &Selector) -> Result<()>;

    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementRef>>;

    /// First descendant of `parent` matching `selector`, if any.
    async fn query_within(&self, parent: &ElementRef, selector: &Selector)
        -> Result<Option<ElementRef>>;

    async fn inner_text(&self, element: &ElementRef) -> Result<String>;

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    /// Release the page. Called exactly once per run.
    async fn close(&self) -> Result<()>;
}

/// Parsed selectors for the login form and the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSelectors {
    pub username_input: Selector,
    pub next_button: Selector,
    pub password_input: Selector,
    pub login_button: Selector,
    pub post: Selector,
    pub post_text: Selector,
    pub post_time: Selector,
    pub post_likes: Selector,
    pub post_retweets: Selector,
}

impl From<&SelectorConfig> for FeedSelectors {
    fn from(c: &SelectorConfig) -> Self {
        Self {
            username_input: Selector::parse(&c.username_input),
            next_button: Selector::parse(&c.next_button),
            password_input: Selector::parse(&c.password_input),
            login_button: Selector::parse(&c.login_button),
            post: Selector::parse(&c.post),
            post_text: Selector::parse(&c.post_text),
            post_time: Selector::parse(&c.post_time),
            post_likes: Selector::parse(&c.post_likes),
            post_retweets: Selector::parse(&c.post_retweets),
        }
    }
}

impl Default for FeedSelectors {
    fn default() -> Self {
        Self::from(&SelectorConfig::default())
    }
}
