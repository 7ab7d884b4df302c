pub mod gemini;
pub mod openai;

use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use crate::domain::llm_config::LLMProvider;
use async_trait::async_trait;
use gemini::GeminiClient;
use openai::OpenAIClient;

#[async_trait]
pub trait LLMClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String>;
}

/// Dispatches to the wire protocol of the configured provider.
pub struct RouterClient {
    openai: OpenAIClient,
    gemini: GeminiClient,
}

impl RouterClient {
    pub fn new() -> Self {
        Self {
            openai: OpenAIClient::new(),
            gemini: GeminiClient::new(),
        }
    }
}

impl Default for RouterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for RouterClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        match config.provider {
            LLMProvider::Google => self.gemini.generate(config, system, user).await,
            _ => self.openai.generate(config, system, user).await,
        }
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
