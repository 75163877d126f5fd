pub mod error;
pub mod types;

pub use error::{Result, WebDriverError};
pub use types::{ChromeOptions, ElementId, Locator};

use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use types::{Envelope, ErrorValue};

/// Client for a WebDriver remote end (chromedriver, or Browserless at `/webdriver`).
#[derive(Clone)]
pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl WebDriverClient {
    /// `timeout` bounds every HTTP round-trip to the remote end.
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{}", self.base_url, path);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut req = self.client.request(method, self.endpoint(path));
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), text));
        }

        let envelope: Envelope = serde_json::from_str(&text)?;
        Ok(envelope.value)
    }

    /// Start a new browser session.
    pub async fn new_session(&self, options: &ChromeOptions) -> Result<Session> {
        let value = self
            .send(Method::POST, "/session", Some(options.capabilities()))
            .await?;

        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Protocol("session response missing sessionId".into()))?
            .to_string();

        tracing::info!(session_id = %id, "WebDriver session started");

        Ok(Session {
            client: self.clone(),
            id,
        })
    }
}

/// One browser session. All commands are sent sequentially by the owner.
pub struct Session {
    client: WebDriverClient,
    id: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.id, suffix)
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.client
            .send(Method::POST, &self.path("/url"), Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn find(&self, locator: &Locator) -> Result<ElementId> {
        let value = self
            .client
            .send(
                Method::POST,
                &self.path("/element"),
                Some(serde_json::to_value(locator)?),
            )
            .await?;
        element_from(&value)
    }

    pub async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementId>> {
        let value = self
            .client
            .send(
                Method::POST,
                &self.path("/elements"),
                Some(serde_json::to_value(locator)?),
            )
            .await?;
        elements_from(&value)
    }

    /// Find a descendant of `parent`. `Ok(None)` when nothing matches.
    pub async fn find_in(&self, parent: &ElementId, locator: &Locator) -> Result<Option<ElementId>> {
        let result = self
            .client
            .send(
                Method::POST,
                &self.path(&format!("/element/{}/element", parent.0)),
                Some(serde_json::to_value(locator)?),
            )
            .await;

        match result {
            Ok(value) => element_from(&value).map(Some),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn click(&self, element: &ElementId) -> Result<()> {
        self.client
            .send(
                Method::POST,
                &self.path(&format!("/element/{}/click", element.0)),
                Some(json!({})),
            )
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &ElementId, text: &str) -> Result<()> {
        self.client
            .send(
                Method::POST,
                &self.path(&format!("/element/{}/value", element.0)),
                Some(json!({ "text": text })),
            )
            .await?;
        Ok(())
    }

    pub async fn text(&self, element: &ElementId) -> Result<String> {
        let value = self
            .client
            .send(
                Method::GET,
                &self.path(&format!("/element/{}/text", element.0)),
                None,
            )
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn attribute(&self, element: &ElementId, name: &str) -> Result<Option<String>> {
        let value = self
            .client
            .send(
                Method::GET,
                &self.path(&format!("/element/{}/attribute/{}", element.0, name)),
                None,
            )
            .await?;
        Ok(value.as_str().map(String::from))
    }

    /// End the session and close the browser window.
    pub async fn delete(&self) -> Result<()> {
        self.client
            .send(Method::DELETE, &self.path(""), None)
            .await?;
        tracing::info!(session_id = %self.id, "WebDriver session closed");
        Ok(())
    }
}

/// Map a failed response to an error. The W3C "no such element" code gets its
/// own variant so lookups can treat it as absence.
fn error_from_response(status: u16, body: String) -> WebDriverError {
    let err = serde_json::from_str::<Envelope>(&body)
        .ok()
        .and_then(|env| serde_json::from_value::<ErrorValue>(env.value).ok());
    match err {
        Some(e) if e.error == "no such element" => WebDriverError::NoSuchElement(e.message),
        Some(e) => WebDriverError::Api {
            status,
            error: e.error,
            message: e.message,
        },
        None => WebDriverError::Api {
            status,
            error: "unknown error".to_string(),
            message: body,
        },
    }
}

fn element_from(value: &Value) -> Result<ElementId> {
    ElementId::from_value(value)
        .ok_or_else(|| WebDriverError::Protocol(format!("not an element reference: {value}")))
}

fn elements_from(value: &Value) -> Result<Vec<ElementId>> {
    value
        .as_array()
        .ok_or_else(|| WebDriverError::Protocol(format!("expected element array: {value}")))?
        .iter()
        .map(element_from)
        .collect()
}
