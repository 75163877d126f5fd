use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Element lookup strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "using", content = "value")]
pub enum Locator {
    #[serde(rename = "css selector")]
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }
}

/// Opaque element reference handed out by the remote end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

impl ElementId {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementId(id.to_string()))
    }
}

/// Chromium launch options sent as `goog:chromeOptions`.
#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub headless: bool,
    pub args: Vec<String>,
    pub window_size: Option<(u32, u32)>,
    pub user_agent: Option<String>,
}

impl ChromeOptions {
    pub fn capabilities(&self) -> Value {
        let mut args: Vec<String> = Vec::new();
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.args.iter().cloned());
        if let Some((w, h)) = self.window_size {
            args.push(format!("--window-size={w},{h}"));
        }
        if let Some(ref ua) = self.user_agent {
            args.push(format!("--user-agent={ua}"));
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

/// Every WebDriver response wraps its payload in `{"value": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorValue {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}
