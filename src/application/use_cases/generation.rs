use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sends prompts to the configured model and hands back its raw text.
pub struct GenerationClient {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
    timeout: Option<Duration>,
}

impl GenerationClient {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, config: LLMConfig) -> Self {
        Self {
            llm_client,
            config,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Every failure, including an empty answer, is `GenerationUnavailable`.
    /// No retry.
    pub async fn send(&self, prompt: &str) -> Result<String> {
        let call = self.llm_client.generate(&self.config, "", prompt);
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!(timeout_ms = limit.as_millis() as u64, "Generation request timed out");
                AppError::GenerationUnavailable(format!("no response within {:?}", limit))
            })?,
            None => call.await,
        };

        let text = outcome.map_err(|err| {
            warn!(error = %err, model = %self.config.model, "Generation request failed");
            match err {
                AppError::GenerationUnavailable(message) => {
                    AppError::GenerationUnavailable(message)
                }
                AppError::LLMError(message) => AppError::GenerationUnavailable(message),
                other => AppError::GenerationUnavailable(other.to_string()),
            }
        })?;

        if text.trim().is_empty() {
            return Err(AppError::GenerationUnavailable(
                "model returned an empty response".to_string(),
            ));
        }

        debug!(chars = text.len(), "Generation response received");
        Ok(text)
    }
}
