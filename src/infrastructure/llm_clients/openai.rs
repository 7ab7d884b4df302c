use super::{join_url, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Chat-completions client for OpenAI, OpenRouter and local OpenAI-compatible servers.
pub struct OpenAIClient {
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn build_body(config: &LLMConfig, system: &str, user: &str) -> Value {
        let mut messages = Vec::new();
        if !system.trim().is_empty() {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": user }));

        json!({
            "model": config.model,
            "messages": messages,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder, config: &LLMConfig) -> reqwest::RequestBuilder {
        match &config.api_key {
            Some(api_key) => builder.bearer_auth(api_key),
            None => builder,
        }
    }
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let url = join_url(&config.base_url, "chat/completions");
        let body = Self::build_body(config, system, user);

        let response = self
            .authorize(self.client.post(&url), config)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
    }
}
