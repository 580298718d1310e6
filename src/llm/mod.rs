pub mod providers;
pub mod translation;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OpenAIConfig;
use crate::Result;

/// Chat message for LLM communication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for chat-completion providers
#[async_trait]
pub trait LLM: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse>;
    fn model(&self) -> &str;
}

/// Create the translation LLM from configuration
pub fn create_llm(config: &OpenAIConfig) -> Result<Box<dyn LLM>> {
    Ok(Box::new(providers::OpenAIProvider::new(config.clone())?))
}
