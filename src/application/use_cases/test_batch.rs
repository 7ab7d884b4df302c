use crate::application::use_cases::generation::GenerationClient;
use crate::application::use_cases::prompt_builder::{build_test_case_prompt, DEFAULT_MIN_TEST_CASES};
use crate::application::use_cases::response_parser::ResponseParser;
use crate::application::use_cases::test_executor::{ExecutionTarget, TestExecutor};
use crate::domain::endpoint::EndpointDescription;
use crate::domain::error::{AppError, Result};
use crate::domain::test_case::ExecutionResult;
use crate::infrastructure::db::endpoints::EndpointStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Body of a test-api call: the endpoint plus whether it is already stored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TestApiRequest {
    #[serde(flatten)]
    pub endpoint: EndpointDescription,
    #[serde(default)]
    pub is_previous: bool,
}

pub struct TestBatchUseCase {
    generation: Arc<GenerationClient>,
    parser: ResponseParser,
    executor: TestExecutor,
    store: Arc<dyn EndpointStore + Send + Sync>,
    min_cases: usize,
}

impl TestBatchUseCase {
    pub fn new(
        generation: Arc<GenerationClient>,
        parser: ResponseParser,
        executor: TestExecutor,
        store: Arc<dyn EndpointStore + Send + Sync>,
    ) -> Self {
        Self {
            generation,
            parser,
            executor,
            store,
            min_cases: DEFAULT_MIN_TEST_CASES,
        }
    }

    pub fn with_min_cases(mut self, min_cases: usize) -> Self {
        self.min_cases = min_cases.max(1);
        self
    }

    /// Generate, validate and execute test cases for one endpoint.
    pub async fn run_test_batch(&self, endpoint: &EndpointDescription) -> Result<Vec<ExecutionResult>> {
        let prompt = build_test_case_prompt(endpoint, self.min_cases);
        let raw = self.generation.send(&prompt).await?;

        let cases = self.parser.parse(&raw).map_err(|err| {
            match &err {
                AppError::MalformedGenerationOutput { raw, .. } => error!(
                    api = %endpoint.api_name,
                    error = %err,
                    raw = %raw_preview(raw),
                    "Invalid JSON response from model"
                ),
                _ => error!(api = %endpoint.api_name, error = %err, "Generated test cases rejected"),
            }
            err
        })?;
        if cases.is_empty() {
            return Err(AppError::ValidationError(
                "No test cases generated".to_string(),
            ));
        }

        info!(
            api = %endpoint.api_name,
            method = %endpoint.http_method,
            cases = cases.len(),
            "Executing generated test cases"
        );
        let target = ExecutionTarget::from(endpoint);
        Ok(self.executor.execute(&target, cases).await)
    }

    /// Stores the endpoint unless it came from the catalog, then runs a batch.
    pub async fn test_api(&self, request: TestApiRequest) -> Result<Vec<ExecutionResult>> {
        let endpoint = request.endpoint.validated()?;
        if !request.is_previous {
            let record = self.store.put(endpoint.clone()).await?;
            info!(api_id = %record.id, user_id = %endpoint.user_id, "Stored endpoint before testing");
        }
        self.run_test_batch(&endpoint).await
    }
}

const RAW_PREVIEW_CHARS: usize = 2000;

fn raw_preview(raw: &str) -> String {
    let mut preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
    if preview.len() < raw.len() {
        preview.push_str("...");
    }
    preview
}
