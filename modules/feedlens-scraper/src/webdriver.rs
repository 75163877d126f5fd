use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use webdriver_client::{ElementId, Locator, Session};

use crate::page::{ElementRef, Page, Selector};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn locator(selector: &Selector) -> Locator {
    match selector {
        Selector::Css(s) => Locator::css(s.clone()),
        Selector::XPath(s) => Locator::xpath(s.clone()),
    }
}

fn element_id(element: &ElementRef) -> ElementId {
    ElementId(element.0.clone())
}

/// [`Page`] backed by a WebDriver session.
pub struct WebDriverPage {
    session: Session,
    poll_interval: Duration,
}

impl WebDriverPage {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.session
            .goto(url)
            .await
            .with_context(|| format!("navigate to {url}"))
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let locator = locator(selector);
        loop {
            match self.session.find(&locator).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_no_such_element() => {}
                Err(e) => return Err(e).with_context(|| format!("wait for {selector}")),
            }
            if Instant::now() >= deadline {
                bail!("{selector} did not appear within {}s", timeout.as_secs_f32());
            }
            debug!(%selector, "Waiting for element");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fill(&self, selector: &Selector, text: &str) -> Result<()> {
        let element = self
            .session
            .find(&locator(selector))
            .await
            .with_context(|| format!("fill {selector}"))?;
        self.session.send_keys(&element, text).await?;
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> Result<()> {
        let element = self
            .session
            .find(&locator(selector))
            .await
            .with_context(|| format!("click {selector}"))?;
        self.session.click(&element).await?;
        Ok(())
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementRef>> {
        let ids = self.session.find_all(&locator(selector)).await?;
        Ok(ids.into_iter().map(|id| ElementRef(id.0)).collect())
    }

    async fn query_within(
        &self,
        parent: &ElementRef,
        selector: &Selector,
    ) -> Result<Option<ElementRef>> {
        let found = self
            .session
            .find_in(&element_id(parent), &locator(selector))
            .await?;
        Ok(found.map(|id| ElementRef(id.0)))
    }

    async fn inner_text(&self, element: &ElementRef) -> Result<String> {
        Ok(self.session.text(&element_id(element)).await?)
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        Ok(self.session.attribute(&element_id(element), name).await?)
    }

    async fn close(&self) -> Result<()> {
        self.session.delete().await.context("close browser session")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_map_to_locators() {
        assert_eq!(
            locator(&Selector::parse("article")),
            Locator::css("article")
        );
        assert_eq!(
            locator(&Selector::parse("//span[text()='Next']")),
            Locator::xpath("//span[text()='Next']")
        );
    }
}
