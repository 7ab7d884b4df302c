use crate::application::use_cases::endpoint_catalog::EndpointCatalogUseCase;
use crate::application::use_cases::generation::GenerationClient;
use crate::application::use_cases::response_parser::ResponseParser;
use crate::application::use_cases::script_export::ScriptExportUseCase;
use crate::application::use_cases::script_generator::{ScriptGenerator, ScriptGeneratorUseCase};
use crate::application::use_cases::test_batch::TestBatchUseCase;
use crate::application::use_cases::test_executor::TestExecutor;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::endpoints::{EndpointStore, SqliteEndpointStore};
use crate::infrastructure::db::export_credentials::ExportCredentialRepository;
use crate::infrastructure::github::GitHubClient;
use crate::infrastructure::llm_clients::LLMClient;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Use cases shared by every HTTP worker.
pub struct AppState {
    pub test_batch: TestBatchUseCase,
    pub catalog: EndpointCatalogUseCase,
    pub scripts: ScriptGeneratorUseCase,
    pub export: ScriptExportUseCase,
}

impl AppState {
    pub fn build(
        config: &AppConfig,
        pool: SqlitePool,
        llm_client: Arc<dyn LLMClient + Send + Sync>,
    ) -> Self {
        let store: Arc<dyn EndpointStore + Send + Sync> =
            Arc::new(SqliteEndpointStore::new(pool.clone()));
        let generation = Arc::new(
            GenerationClient::new(llm_client, config.llm.clone())
                .with_timeout(config.generation.timeout()),
        );

        let test_batch = TestBatchUseCase::new(
            Arc::clone(&generation),
            ResponseParser::new(config.parser.policy),
            TestExecutor::new(
                config.executor.request_timeout(),
                config.executor.max_concurrency,
            ),
            Arc::clone(&store),
        )
        .with_min_cases(config.generation.min_test_cases);

        let scripts = ScriptGeneratorUseCase::new(
            ScriptGenerator::new(Arc::clone(&generation)),
            Arc::clone(&store),
        );

        let export = ScriptExportUseCase::new(
            Arc::new(ExportCredentialRepository::new(pool)),
            GitHubClient::new(&config.export.github_api_base, &config.export.branch),
        );

        Self {
            test_batch,
            catalog: EndpointCatalogUseCase::new(store),
            scripts,
            export,
        }
    }
}
