use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    Local,
    OpenAI,
    OpenRouter,
    Google,
}

impl LLMProvider {
    /// Keyring account name for this provider's API key.
    pub fn key_name(&self) -> &'static str {
        match self {
            LLMProvider::Local => "local",
            LLMProvider::OpenAI => "openai",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Google => "google",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub top_k: Option<u32>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Google,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            max_tokens: Some(8192),
            temperature: Some(1.0),
            top_p: Some(0.95),
            top_k: Some(40),
        }
    }
}
