use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::test_case::ValidationPolicy;
use crate::infrastructure::security::keyring::KeyringManager;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

const KEYRING_SERVICE: &str = "api-testgen";
const DEFAULT_CONFIG_FILE: &str = "testgen.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// `None` leaves the generation call bounded only by the transport.
    pub timeout_secs: Option<u64>,
    pub min_test_cases: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorSettings {
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserSettings {
    pub policy: ValidationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    pub github_api_base: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub llm: LLMConfig,
    pub generation: GenerationSettings,
    pub executor: ExecutorSettings,
    pub parser: ParserSettings,
    pub export: ExportSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            database_url: "sqlite://testgen.db".to_string(),
            llm: LLMConfig::default(),
            generation: GenerationSettings {
                timeout_secs: Some(120),
                min_test_cases: 10,
            },
            executor: ExecutorSettings {
                request_timeout_secs: 30,
                max_concurrency: 64,
            },
            parser: ParserSettings {
                policy: ValidationPolicy::Strict,
            },
            export: ExportSettings {
                github_api_base: "https://api.github.com".to_string(),
                branch: "main".to_string(),
            },
        }
    }
}

impl GenerationSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl ExecutorSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    /// Defaults, then the TOML file, then `TESTGEN_*` variables (`__` nests).
    pub fn figment(config_path: PathBuf) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("TESTGEN_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.executor.max_concurrency == 0 {
            return Err(AppError::ValidationError(
                "executor.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.executor.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(AppError::ValidationError(format!(
                "executor.max_concurrency must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.executor.request_timeout_secs == 0 {
            return Err(AppError::ValidationError(
                "executor.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.generation.min_test_cases == 0 {
            return Err(AppError::ValidationError(
                "generation.min_test_cases must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigService {
    keyring: KeyringManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    pub fn load(&self) -> Result<AppConfig> {
        if let Ok(path) = dotenvy::dotenv() {
            info!(path = %path.display(), "Loaded environment file");
        }

        let config_path = std::env::var("TESTGEN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = AppConfig::from_figment(AppConfig::figment(config_path))?;
        self.resolve_api_key(&mut config.llm);
        Ok(config)
    }

    /// Falls back to the OS keyring when no API key was configured.
    pub fn resolve_api_key(&self, llm: &mut LLMConfig) {
        if llm.api_key.as_deref().is_some_and(|key| !key.trim().is_empty()) {
            return;
        }

        let account = llm.provider.key_name();
        match self.keyring.find_secret(account) {
            Ok(Some(secret)) => {
                info!(provider = account, "Using API key from keyring");
                llm.api_key = Some(secret);
            }
            Ok(None) => warn!(provider = account, "No API key configured for provider"),
            Err(err) => warn!(provider = account, error = %err, "Keyring lookup failed"),
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
