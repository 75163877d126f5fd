use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// Message Types
// =============================================================================

/// A user turn of a chat conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

// =============================================================================
// Completion Options
// =============================================================================

/// Sampling and size limits for a single completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Hard cap on generated tokens. Bounds the size of the reply.
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.3,
        }
    }
}

// =============================================================================
// JsonCompletion Trait
// =============================================================================

/// A chat completion forced into JSON-object mode.
///
/// Returns the raw message content. Callers own parsing, since providers do not
/// always honour the response format.
#[async_trait]
pub trait JsonCompletion: Send + Sync {
    async fn complete_json(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<String>;
}
