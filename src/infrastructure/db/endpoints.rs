use crate::domain::endpoint::{EndpointDescription, EndpointFilter, EndpointRecord, HttpMethod};
use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Storage for endpoint descriptions. Single-record operations only.
#[async_trait]
pub trait EndpointStore {
    /// Stores the endpoint under a fresh id and creation time.
    async fn put(&self, endpoint: EndpointDescription) -> Result<EndpointRecord>;
    async fn get(&self, id: &str) -> Result<Option<EndpointRecord>>;
    /// Newest first.
    async fn list(&self, filter: &EndpointFilter) -> Result<Vec<EndpointRecord>>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

pub struct SqliteEndpointStore {
    pool: SqlitePool,
}

impl SqliteEndpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, api_name, api_url, http_method, headers_json, parameters_json, payload_json, user_id, created_at FROM endpoints";

#[async_trait]
impl EndpointStore for SqliteEndpointStore {
    async fn put(&self, endpoint: EndpointDescription) -> Result<EndpointRecord> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let created_at = timestamp(now_ms)?;
        let record = EndpointRecord {
            id: Uuid::new_v4().to_string(),
            endpoint,
            created_at,
        };

        sqlx::query(
            "INSERT INTO endpoints (id, api_name, api_url, http_method, headers_json, parameters_json, payload_json, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.endpoint.api_name)
        .bind(&record.endpoint.api_url)
        .bind(record.endpoint.http_method.as_str())
        .bind(to_json_column(&record.endpoint.headers)?)
        .bind(to_json_column(&record.endpoint.parameters)?)
        .bind(to_json_column(&record.endpoint.payload)?)
        .bind(&record.endpoint.user_id)
        .bind(now_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert endpoint: {e}")))?;

        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<EndpointRecord>> {
        let entity = sqlx::query_as::<_, EndpointEntity>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch endpoint: {e}")))?;

        entity.map(EndpointRecord::try_from).transpose()
    }

    async fn list(&self, filter: &EndpointFilter) -> Result<Vec<EndpointRecord>> {
        let entities = match filter.user_id.as_deref() {
            Some(user_id) => {
                sqlx::query_as::<_, EndpointEntity>(&format!(
                    "{SELECT_COLUMNS} WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, EndpointEntity>(&format!(
                    "{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::DatabaseError(format!("Failed to list endpoints: {e}")))?;

        entities.into_iter().map(EndpointRecord::try_from).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM endpoints WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete endpoint: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(sqlx::FromRow)]
struct EndpointEntity {
    id: String,
    api_name: String,
    api_url: String,
    http_method: String,
    headers_json: Option<String>,
    parameters_json: Option<String>,
    payload_json: Option<String>,
    user_id: String,
    created_at: i64,
}

impl TryFrom<EndpointEntity> for EndpointRecord {
    type Error = AppError;

    fn try_from(e: EndpointEntity) -> Result<Self> {
        let http_method: HttpMethod = e.http_method.parse().map_err(|_| {
            AppError::DatabaseError(format!("Stored endpoint {} has method {}", e.id, e.http_method))
        })?;
        Ok(Self {
            endpoint: EndpointDescription {
                api_name: e.api_name,
                api_url: e.api_url,
                http_method,
                headers: from_json_column(e.headers_json)?,
                parameters: from_json_column(e.parameters_json)?,
                payload: from_json_column(e.payload_json)?,
                user_id: e.user_id,
            },
            created_at: timestamp(e.created_at)?,
            id: e.id,
        })
    }
}

fn timestamp(millis: i64) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::DatabaseError(format!("Invalid timestamp: {millis}")))
}

fn to_json_column<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| AppError::DatabaseError(format!("Failed to encode column: {e}")))
}

fn from_json_column<T: DeserializeOwned>(value: Option<String>) -> Result<Option<T>> {
    value
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| AppError::DatabaseError(format!("Failed to decode column: {e}")))
}
