use crate::application::use_cases::generation::GenerationClient;
use crate::application::use_cases::prompt_builder::build_script_prompt;
use crate::domain::endpoint::EndpointDescription;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::endpoints::EndpointStore;
use crate::infrastructure::ingest::parse_upload;
use crate::infrastructure::response::{clean_llm_response, extract_first_code_block};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Owner recorded on uploaded endpoints when the caller names none.
const UPLOAD_OWNER: &str = "script-upload";

/// Asks the model for a test script and keeps only the code.
pub struct ScriptGenerator {
    generation: Arc<GenerationClient>,
}

impl ScriptGenerator {
    pub fn new(generation: Arc<GenerationClient>) -> Self {
        Self { generation }
    }

    pub async fn generate_script(
        &self,
        endpoint: &EndpointDescription,
        language: &str,
        framework: &str,
    ) -> Result<String> {
        let prompt = build_script_prompt(endpoint, language, framework);
        let raw = self.generation.send(&prompt).await?;
        let script = extract_first_code_block(&clean_llm_response(&raw));
        if script.is_empty() {
            return Err(AppError::GenerationUnavailable(
                "model returned no script".to_string(),
            ));
        }
        Ok(script)
    }
}

pub struct ScriptGeneratorUseCase {
    generator: ScriptGenerator,
    store: Arc<dyn EndpointStore + Send + Sync>,
}

impl ScriptGeneratorUseCase {
    pub fn new(generator: ScriptGenerator, store: Arc<dyn EndpointStore + Send + Sync>) -> Self {
        Self { generator, store }
    }

    pub async fn generate_for_endpoint(
        &self,
        api_id: &str,
        language: &str,
        framework: &str,
    ) -> Result<String> {
        let record = self
            .store
            .get(api_id)
            .await?
            .ok_or_else(|| AppError::NotFound("API details not found.".to_string()))?;

        info!(api_id, language, framework, "Generating test script");
        self.generator
            .generate_script(&record.endpoint, language, framework)
            .await
    }

    /// One script per parsed endpoint, keyed `script_<index>`. Stops at the
    /// first generation failure; the uploaded endpoints are stored only once
    /// every script exists.
    pub async fn generate_bulk(
        &self,
        file_name: &str,
        bytes: &[u8],
        user_id: Option<&str>,
        language: &str,
        framework: &str,
    ) -> Result<BTreeMap<String, String>> {
        let owner = user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(UPLOAD_OWNER);
        let endpoints = parse_upload(file_name, bytes, owner)?;
        if endpoints.is_empty() {
            return Err(AppError::ValidationError(
                "No valid API requests found in file".to_string(),
            ));
        }

        let mut scripts = BTreeMap::new();
        for (index, endpoint) in endpoints.iter().enumerate() {
            let script = self
                .generator
                .generate_script(endpoint, language, framework)
                .await
                .map_err(|err| {
                    warn!(index, api = %endpoint.api_name, error = %err, "Bulk script generation failed");
                    err
                })?;
            scripts.insert(format!("script_{}", index), script);
        }

        for endpoint in endpoints {
            self.store.put(endpoint).await?;
        }

        info!(file_name, owner, count = scripts.len(), "Generated scripts from upload");
        Ok(scripts)
    }
}
