use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebDriverError>;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("WebDriver error (status {status}, {error}): {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl WebDriverError {
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, WebDriverError::NoSuchElement(_))
    }
}

impl From<reqwest::Error> for WebDriverError {
    fn from(err: reqwest::Error) -> Self {
        WebDriverError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WebDriverError {
    fn from(err: serde_json::Error) -> Self {
        WebDriverError::Protocol(err.to_string())
    }
}
