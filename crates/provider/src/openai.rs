//! OpenAI-compatible chat completions endpoint
//!
//! Works against OpenAI, OpenRouter, vLLM and any server exposing
//! `/chat/completions` with the same request shape.

use std::time::Duration;

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        Self::with_timeout(api_key, api_base, default_model, Duration::from_secs(60))
    }

    pub fn with_timeout(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
        timeout: Duration,
    ) -> Self {
        let api_key = api_key.into();
        let is_openrouter = api_key.starts_with("sk-or-");

        let api_base = api_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| {
                if is_openrouter {
                    OPENROUTER_API_BASE.to_string()
                } else {
                    OPENAI_API_BASE.to_string()
                }
            });

        let default_model = default_model.unwrap_or_else(|| "gpt-4o-mini".to_string());

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            api_base,
            default_model,
        }
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let mut body = json!({
            "model": model,
            "messages": params.messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        if !params.stop.is_empty() {
            body["stop"] = json!(params.stop);
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let content = choice["message"]["content"].as_str().map(|s| s.to_string());
        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let usage = if let Some(usage) = json["usage"].as_object() {
            let field = |name: &str| usage.get(name).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: field("prompt_tokens"),
                completion_tokens: field("completion_tokens"),
                total_tokens: field("total_tokens"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content,
            finish_reason,
            usage,
        })
    }
}

/// `error.message` from a JSON error body, else the raw body (gateways answer with HTML)
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string));

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => "unknown error".to_string(),
        None => body.trim().chars().take(200).collect(),
    }
}

#[async_trait::async_trait]
impl Provider for OpenAiProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }
        trace!("POST {}/chat/completions", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&params);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let json: serde_json::Value = response.json().await?;
        let parsed = self.parse_response(json)?;
        debug!(
            tokens = parsed.usage.total_tokens,
            finish_reason = %parsed.finish_reason,
            "completion received"
        );
        Ok(parsed)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
