mod client;
pub(crate) mod types;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::traits::{CompletionOptions, JsonCompletion, Message};
use client::OpenAiClient;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Groq serves the same wire protocol under this prefix.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// OpenAi Agent
// =============================================================================

/// Client for any endpoint speaking the OpenAI `/chat/completions` protocol.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    pub(crate) fn client(&self) -> OpenAiClient {
        OpenAiClient::new(&self.api_key, self.base_url(), self.timeout)
    }
}

// =============================================================================
// JsonCompletion Implementation
// =============================================================================

#[async_trait]
impl JsonCompletion for OpenAi {
    async fn complete_json(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<String> {
        let mut request = types::ChatRequest::new(&self.model);
        for msg in &messages {
            request = request.message(msg.into());
        }
        let request = request
            .limits(options.max_tokens, options.temperature)
            .json_object();

        self.client().chat_content(&request).await
    }
}
