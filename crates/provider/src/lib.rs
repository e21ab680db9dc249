//! LLM provider abstraction
//!
//! The agent only needs one capability from a model: take an ordered list of
//! role/content messages and return text. [`Provider`] is that seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use thiserror::Error;

pub mod openai;

pub use openai::OpenAiProvider;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no API key configured")]
    NoApiKey,

    #[error("invalid response")]
    InvalidResponse,

    #[error("empty response from model")]
    EmptyResponse,

    #[error("rate limited")]
    RateLimited,
}

impl ProviderError {
    /// Whether the same request may succeed if sent again later
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ProviderError::RateLimited => true,
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::Json(_)
            | ProviderError::NoApiKey
            | ProviderError::InvalidResponse
            | ProviderError::EmptyResponse => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Model response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Option<String>,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Request parameters
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Sequences at which the model should stop generating
    pub stop: Vec<String>,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            max_tokens: 1024,
            temperature: 0.0,
            stop: Vec::new(),
        }
    }
}

/// A text-generating model endpoint
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;

    /// Text of the reply; a missing or blank reply is an error
    async fn generate(&self, params: ChatParams) -> Result<String> {
        let response = self.chat(params).await?;
        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ProviderError::EmptyResponse),
        }
    }
}
