use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use feedlens_common::config::ScraperConfig;
use feedlens_common::{FeedlensError, Result, ScrapedPost};

use crate::page::{ElementRef, FeedSelectors, Page, Selector};

const DATETIME_ATTR: &str = "datetime";
const DEFAULT_COUNT: &str = "0";

/// Login credentials. Debug output never shows the password.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SpiderConfig {
    pub login_url: String,
    pub max_posts: usize,
    /// Upper bound on every single page interaction.
    pub step_timeout: Duration,
    /// Pause after each navigation-causing step.
    pub request_delay: Duration,
    pub selectors: FeedSelectors,
}

impl From<&ScraperConfig> for SpiderConfig {
    fn from(c: &ScraperConfig) -> Self {
        Self {
            login_url: c.login_url.clone(),
            max_posts: c.max_posts,
            step_timeout: Duration::from_secs(c.timeout_secs),
            request_delay: Duration::from_millis(c.request_delay_ms),
            selectors: FeedSelectors::from(&c.selectors),
        }
    }
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self::from(&ScraperConfig::default())
    }
}

/// Result of one spider run.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub posts: Vec<ScrapedPost>,
    /// Posts found on the page but dropped because extraction failed.
    pub skipped: usize,
    /// Set when login or feed loading failed; `posts` is then empty.
    pub failure: Option<FeedlensError>,
}

/// Logs in and reads the first posts of the home feed, strictly sequentially:
/// login-navigate, credential-fill, submit, feed-wait, extract, close.
pub struct FeedSpider<'a, P: Page + ?Sized> {
    page: &'a P,
    config: SpiderConfig,
}

impl<'a, P: Page + ?Sized> FeedSpider<'a, P> {
    pub fn new(page: &'a P, config: SpiderConfig) -> Self {
        Self { page, config }
    }

    /// Run the whole flow. The page is closed on every path.
    pub async fn run(&self, credentials: &Credentials) -> ScrapeOutcome {
        let outcome = match self.login(credentials).await {
            Ok(()) => self.extract().await,
            Err(e) => {
                error!(error = %e, "Login failed, no posts scraped");
                ScrapeOutcome {
                    failure: Some(e),
                    ..Default::default()
                }
            }
        };

        if let Err(e) = self.page.close().await {
            let error = format!("{e:#}");
            warn!(%error, "Failed to close page");
        }
        outcome
    }

    /// Bound `fut` by the step timeout and tag failures with `stage`.
    async fn step<T>(
        &self,
        stage: &str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.step_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(FeedlensError::Scrape {
                stage: stage.to_string(),
                message: format!("{e:#}"),
            }),
            Err(_) => Err(FeedlensError::Scrape {
                stage: stage.to_string(),
                message: format!(
                    "timed out after {}s",
                    self.config.step_timeout.as_secs_f32()
                ),
            }),
        }
    }

    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }

    async fn fill_when_ready(&self, selector: &Selector, text: &str) -> anyhow::Result<()> {
        self.page.wait_for(selector, self.config.step_timeout).await?;
        self.page.fill(selector, text).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<()> {
        let s = &self.config.selectors;

        info!(url = %self.config.login_url, "Opening login page");
        self.step("login-navigate", self.page.navigate(&self.config.login_url))
            .await?;
        self.pause().await;

        self.step("credential-fill", async {
            self.fill_when_ready(&s.username_input, &credentials.username)
                .await?;
            self.page.click(&s.next_button).await
        })
        .await?;

        self.step("submit", async {
            self.fill_when_ready(&s.password_input, &credentials.password)
                .await?;
            self.page.click(&s.login_button).await
        })
        .await?;
        self.pause().await;

        self.step(
            "feed-wait",
            self.page.wait_for(&s.post, self.config.step_timeout),
        )
        .await?;
        info!("Logged in, feed loaded");
        Ok(())
    }

    async fn extract(&self) -> ScrapeOutcome {
        let mut outcome = ScrapeOutcome::default();

        let elements = match self
            .step("extract", self.page.query_all(&self.config.selectors.post))
            .await
        {
            Ok(elements) => elements,
            Err(e) => {
                error!(error = %e, "Could not list posts");
                return outcome;
            }
        };

        for (index, element) in elements.iter().take(self.config.max_posts).enumerate() {
            match self.step("extract", self.extract_post(element)).await {
                Ok(post) => {
                    debug!(index, likes = %post.likes, "Extracted post");
                    outcome.posts.push(post);
                }
                Err(e) => {
                    outcome.skipped += 1;
                    error!(index, error = %e, "Error parsing post, skipping");
                }
            }
        }

        info!(
            found = elements.len(),
            extracted = outcome.posts.len(),
            skipped = outcome.skipped,
            "Extraction complete"
        );
        outcome
    }

    /// Read one post. Missing fields get defaults; only page errors fail.
    async fn extract_post(&self, post: &ElementRef) -> anyhow::Result<ScrapedPost> {
        let s = &self.config.selectors;

        let text = self.child_text(post, &s.post_text).await?.unwrap_or_default();

        let timestamp = match self.page.query_within(post, &s.post_time).await? {
            Some(time) => self
                .page
                .attribute(&time, DATETIME_ATTR)
                .await?
                .unwrap_or_default(),
            None => String::new(),
        };

        let likes = self.count(post, &s.post_likes).await?;
        let retweets = self.count(post, &s.post_retweets).await?;

        Ok(ScrapedPost {
            text,
            timestamp,
            likes,
            retweets,
        })
    }

    async fn child_text(
        &self,
        parent: &ElementRef,
        selector: &Selector,
    ) -> anyhow::Result<Option<String>> {
        match self.page.query_within(parent, selector).await? {
            Some(child) => Ok(Some(self.page.inner_text(&child).await?)),
            None => Ok(None),
        }
    }

    /// Displayed count ("1.2K"), or "0" when absent or blank.
    async fn count(&self, parent: &ElementRef, selector: &Selector) -> anyhow::Result<String> {
        Ok(self
            .child_text(parent, selector)
            .await?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_COUNT.to_string()))
    }
}

/// Write scraped posts as a JSON array. Nothing is written for an empty scrape.
pub fn write_posts(path: &Path, posts: &[ScrapedPost]) -> Result<Option<PathBuf>> {
    if posts.is_empty() {
        info!(path = %path.display(), "No posts scraped, not writing output");
        return Ok(None);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(posts)?)?;
    info!(path = %path.display(), posts = posts.len(), "Posts written");
    Ok(Some(path.to_path_buf()))
}
