use crate::domain::error::{AppError, Result};
use crate::domain::script::ExportCredentials;
use sqlx::SqlitePool;

/// GitHub owner, repository URL and token per owner.
pub struct ExportCredentialRepository {
    pool: SqlitePool,
}

impl ExportCredentialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, details: &ExportCredentials) -> Result<()> {
        sqlx::query(
            "INSERT INTO export_credentials (owner, repo, access_token, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(owner) DO UPDATE SET
                repo = excluded.repo,
                access_token = excluded.access_token,
                updated_at = excluded.updated_at",
        )
        .bind(&details.owner)
        .bind(&details.repo)
        .bind(&details.access_token)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to save GitHub details: {e}")))?;
        Ok(())
    }

    pub async fn get(&self, owner: &str) -> Result<Option<ExportCredentials>> {
        sqlx::query_as::<_, CredentialEntity>(
            "SELECT owner, repo, access_token FROM export_credentials WHERE owner = ?",
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch GitHub details: {e}")))
        .map(|entity| entity.map(Into::into))
    }

    /// Fails with `NotFound` when the owner has no stored details.
    pub async fn update(&self, details: &ExportCredentials) -> Result<()> {
        let result = sqlx::query(
            "UPDATE export_credentials SET repo = ?, access_token = ?, updated_at = ? WHERE owner = ?",
        )
        .bind(&details.repo)
        .bind(&details.access_token)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(&details.owner)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to update GitHub details: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "GitHub details for owner {}",
                details.owner
            )));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct CredentialEntity {
    owner: String,
    repo: String,
    access_token: String,
}

impl From<CredentialEntity> for ExportCredentials {
    fn from(e: CredentialEntity) -> Self {
        Self {
            owner: e.owner,
            repo: e.repo,
            access_token: e.access_token,
        }
    }
}
