use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// LLM stand-in that answers with queued replies and records every prompt.
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub(crate) fn replying(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    pub(crate) fn slow(delay: Duration, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Ok(reply.to_string())])),
            prompts: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for ScriptedLlm {
    async fn generate(&self, _config: &LLMConfig, _system: &str, user: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(AppError::LLMError("no scripted reply left".to_string())))
    }
}
