use crate::domain::error::{AppError, Result};
use crate::domain::script::{ExportCredentials, ScriptExport};
use crate::infrastructure::db::export_credentials::ExportCredentialRepository;
use crate::infrastructure::github::{extract_repo_details, GitHubClient};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub struct ScriptExportUseCase {
    credentials: Arc<ExportCredentialRepository>,
    github: GitHubClient,
}

impl ScriptExportUseCase {
    pub fn new(credentials: Arc<ExportCredentialRepository>, github: GitHubClient) -> Self {
        Self {
            credentials,
            github,
        }
    }

    pub async fn save_details(&self, details: ExportCredentials) -> Result<()> {
        validate(&details)?;
        extract_repo_details(&details.repo)?;
        self.credentials.save(&details).await?;
        info!(owner = %details.owner, "Saved GitHub details");
        Ok(())
    }

    pub async fn get_details(&self, owner: &str) -> Result<ExportCredentials> {
        self.credentials
            .get(owner)
            .await?
            .ok_or_else(|| AppError::NotFound("GitHub details not found".to_string()))
    }

    pub async fn update_details(&self, details: ExportCredentials) -> Result<()> {
        validate(&details)?;
        extract_repo_details(&details.repo)?;
        self.credentials.update(&details).await
    }

    /// Commits the script to the owner's stored repository.
    pub async fn export(&self, export: ScriptExport) -> Result<String> {
        validate(&export)?;
        let details = self.get_details(&export.owner).await?;
        let repo = extract_repo_details(&details.repo)?;

        self.github
            .put_file(&repo, &details.access_token, &export.file_name, &export.script_content)
            .await?;
        Ok(format!("File '{}' committed successfully", export.file_name))
    }
}

fn validate<T: Validate>(value: &T) -> Result<()> {
    value
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::connection::init_db;
    use actix_web::{web, App, HttpResponse, HttpServer};
    use serde_json::json;

    async fn use_case(api_base: &str) -> ScriptExportUseCase {
        let pool = init_db("sqlite::memory:").await.unwrap();
        ScriptExportUseCase::new(
            Arc::new(ExportCredentialRepository::new(pool)),
            GitHubClient::new(api_base, "main"),
        )
    }

    fn details() -> ExportCredentials {
        ExportCredentials {
            owner: "acme".to_string(),
            repo: "https://github.com/acme/api-tests.git".to_string(),
            access_token: "ghp_token".to_string(),
        }
    }

    #[actix_web::test]
    async fn test_export_commits_to_stored_repo() {
        let server = HttpServer::new(|| {
            App::new()
                .route(
                    "/repos/acme/api-tests/contents/login_test.py",
                    web::get().to(|| async { HttpResponse::NotFound().json(json!({"message": "Not Found"})) }),
                )
                .route(
                    "/repos/acme/api-tests/contents/login_test.py",
                    web::put().to(|| async { HttpResponse::Created().json(json!({})) }),
                )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        let use_case = use_case(&format!("http://{}", addr)).await;
        use_case.save_details(details()).await.unwrap();
        let message = use_case
            .export(ScriptExport {
                file_name: "login_test.py".to_string(),
                script_content: "assert True".to_string(),
                owner: "acme".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(message, "File 'login_test.py' committed successfully");
    }

    #[actix_web::test]
    async fn test_export_without_details_is_not_found() {
        let use_case = use_case("http://127.0.0.1:1").await;
        let err = use_case
            .export(ScriptExport {
                file_name: "a.py".to_string(),
                script_content: String::new(),
                owner: "ghost".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn test_details_round_trip_and_validation() {
        let use_case = use_case("http://127.0.0.1:1").await;
        let mut bad = details();
        bad.access_token = String::new();
        assert!(matches!(
            use_case.save_details(bad).await,
            Err(AppError::ValidationError(_))
        ));

        use_case.save_details(details()).await.unwrap();
        let mut changed = details();
        changed.repo = "https://github.com/acme/other".to_string();
        use_case.update_details(changed.clone()).await.unwrap();
        assert_eq!(use_case.get_details("acme").await.unwrap(), changed);
    }
}
