// Test doubles for the scraper.
//
// - FakePage (Page): a static login form and feed built from FakePost values
// - CapturedLogs: in-memory tracing output for asserting on logged failures

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::page::{ElementRef, FeedSelectors, Page, Selector};

// ---------------------------------------------------------------------------
// FakePost
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub attributes: HashMap<String, String>,
}

impl FakeElement {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }
}

/// A feed post: child elements keyed by selector. Children not added are absent.
#[derive(Debug, Clone, Default)]
pub struct FakePost {
    children: HashMap<Selector, FakeElement>,
    broken: bool,
}

impl FakePost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fully populated post under the default selectors.
    pub fn complete(text: &str, datetime: &str, likes: &str, retweets: &str) -> Self {
        let s = FeedSelectors::default();
        Self::new()
            .child(&s.post_text, FakeElement::text(text))
            .child(&s.post_time, FakeElement::text("").attr("datetime", datetime))
            .child(&s.post_likes, FakeElement::text(likes))
            .child(&s.post_retweets, FakeElement::text(retweets))
    }

    pub fn child(mut self, selector: &Selector, element: FakeElement) -> Self {
        self.children.insert(selector.clone(), element);
        self
    }

    pub fn without(mut self, selector: &Selector) -> Self {
        self.children.remove(selector);
        self
    }

    /// Every lookup inside this post errors.
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

// ---------------------------------------------------------------------------
// FakePage
// ---------------------------------------------------------------------------

/// Login form plus feed. Selectors not marked visible never appear; waiting
/// on them sleeps for the full timeout and fails.
pub struct FakePage {
    selectors: FeedSelectors,
    visible: HashSet<Selector>,
    posts: Vec<FakePost>,
    actions: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakePage {
    /// A page where login succeeds and the feed shows `posts`.
    pub fn feed(posts: Vec<FakePost>) -> Self {
        let selectors = FeedSelectors::default();
        let visible = [
            &selectors.username_input,
            &selectors.next_button,
            &selectors.password_input,
            &selectors.login_button,
            &selectors.post,
        ]
        .into_iter()
        .cloned()
        .collect();
        Self {
            selectors,
            visible,
            posts,
            actions: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Hide an element so it never appears.
    pub fn hide(mut self, selector: &Selector) -> Self {
        self.visible.remove(selector);
        self
    }

    pub fn selectors(&self) -> &FeedSelectors {
        &self.selectors
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    fn ensure_visible(&self, selector: &Selector) -> Result<()> {
        if self.visible.contains(selector) {
            Ok(())
        } else {
            bail!("no element matches {selector}")
        }
    }

    fn post(&self, element: &ElementRef) -> Result<(usize, &FakePost)> {
        let index: usize = element
            .0
            .strip_prefix("post-")
            .and_then(|i| i.parse().ok())
            .ok_or_else(|| anyhow!("not a post element: {}", element.0))?;
        let post = self
            .posts
            .get(index)
            .ok_or_else(|| anyhow!("stale element: {}", element.0))?;
        Ok((index, post))
    }

    /// Child refs look like `post-<i>|<selector>`.
    fn child(&self, element: &ElementRef) -> Result<&FakeElement> {
        let (parent, selector) = element
            .0
            .split_once('|')
            .ok_or_else(|| anyhow!("not a child element: {}", element.0))?;
        let (_, post) = self.post(&ElementRef(parent.to_string()))?;
        post.children
            .iter()
            .find(|(s, _)| s.to_string() == selector)
            .map(|(_, e)| e)
            .ok_or_else(|| anyhow!("stale element: {}", element.0))
    }
}

#[async_trait]
impl Page for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate {url}"));
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<()> {
        if self.visible.contains(selector) {
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        bail!("{selector} did not appear within {}s", timeout.as_secs_f32())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> Result<()> {
        self.ensure_visible(selector)?;
        self.record(format!("fill {selector} ({} chars)", text.chars().count()));
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> Result<()> {
        self.ensure_visible(selector)?;
        self.record(format!("click {selector}"));
        Ok(())
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementRef>> {
        if *selector != self.selectors.post || !self.visible.contains(selector) {
            return Ok(Vec::new());
        }
        Ok((0..self.posts.len())
            .map(|i| ElementRef(format!("post-{i}")))
            .collect())
    }

    async fn query_within(
        &self,
        parent: &ElementRef,
        selector: &Selector,
    ) -> Result<Option<ElementRef>> {
        let (index, post) = self.post(parent)?;
        if post.broken {
            bail!("post-{index} detached from document");
        }
        Ok(post
            .children
            .contains_key(selector)
            .then(|| ElementRef(format!("post-{index}|{selector}"))))
    }

    async fn inner_text(&self, element: &ElementRef) -> Result<String> {
        Ok(self.child(element)?.text.clone())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        Ok(self.child(element)?.attributes.get(name).cloned())
    }

    async fn close(&self) -> Result<()> {
        self.record("close".to_string());
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CapturedLogs
// ---------------------------------------------------------------------------

/// Shared buffer that a `fmt` subscriber writes into.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscriber writing plain-text lines into this buffer.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let logs = self.clone();
        tracing_subscriber::fmt()
            .with_writer(move || logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines logged at `level` (e.g. "ERROR").
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.split_whitespace().nth(1) == Some(level))
            .map(String::from)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
