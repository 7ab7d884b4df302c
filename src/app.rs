use crate::domain::error::AppError;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::db::connection::init_db;
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use crate::interfaces::http::{add_log, new_log_ring, start_server};
use crate::interfaces::state::AppState;
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn to_io(err: AppError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

/// Loads configuration, opens the database and serves HTTP until shutdown.
pub async fn run() -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = ConfigService::new().load().map_err(to_io)?;
    let pool = init_db(&config.database_url).await.map_err(to_io)?;
    let llm_client: Arc<dyn LLMClient + Send + Sync> = Arc::new(RouterClient::new());

    let logs = new_log_ring();
    add_log(
        &logs,
        "INFO",
        "App",
        &format!(
            "Starting with provider={:?} model={} parser={:?} max_concurrency={}",
            config.llm.provider,
            config.llm.model,
            config.parser.policy,
            config.executor.max_concurrency
        ),
    );

    let state = Arc::new(AppState::build(&config, pool, llm_client));
    start_server(state, logs, &config.server)?.await
}
