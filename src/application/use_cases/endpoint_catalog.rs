use crate::domain::endpoint::{EndpointDescription, EndpointFilter, EndpointRecord};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::endpoints::EndpointStore;
use crate::infrastructure::ingest::parse_upload;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Registration, bulk import, lookup and removal of stored endpoints.
pub struct EndpointCatalogUseCase {
    store: Arc<dyn EndpointStore + Send + Sync>,
}

impl EndpointCatalogUseCase {
    pub fn new(store: Arc<dyn EndpointStore + Send + Sync>) -> Self {
        Self { store }
    }

    pub async fn register(&self, endpoint: EndpointDescription) -> Result<EndpointRecord> {
        let record = self.store.put(endpoint.validated()?).await?;
        info!(api_id = %record.id, user_id = %record.endpoint.user_id, "Registered endpoint");
        Ok(record)
    }

    /// Parses and stores an uploaded file. A file without usable rows stores
    /// nothing and returns an empty list.
    pub async fn import_file(&self, file_name: &str, bytes: &[u8], user_id: &str) -> Result<Vec<EndpointRecord>> {
        if user_id.trim().is_empty() {
            return Err(AppError::ValidationError("user_id is required".to_string()));
        }
        let endpoints = parse_upload(file_name, bytes, user_id)?;
        self.store_all(endpoints).await
    }

    /// Every entry is validated before anything is stored.
    pub async fn import_list(&self, endpoints: Vec<EndpointDescription>) -> Result<Vec<EndpointRecord>> {
        let endpoints = endpoints
            .into_iter()
            .enumerate()
            .map(|(index, endpoint)| {
                endpoint.validated().map_err(|e| {
                    AppError::ValidationError(format!("Entry {}: {}", index, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.store_all(endpoints).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<EndpointRecord>> {
        self.store.list(&EndpointFilter::for_user(user_id)).await
    }

    /// One record when `api_id` is given, otherwise all of them. `NotFound`
    /// when nothing matches.
    pub async fn get(&self, api_id: Option<&str>) -> Result<Vec<EndpointRecord>> {
        let records = match api_id {
            Some(id) => self.store.get(id).await?.into_iter().collect(),
            None => self.store.list(&EndpointFilter::default()).await?,
        };
        if records.is_empty() {
            return Err(AppError::NotFound("API details not found".to_string()));
        }
        Ok(records)
    }

    pub async fn delete(&self, api_id: &str) -> Result<()> {
        Uuid::parse_str(api_id).map_err(|_| {
            AppError::ValidationError("Invalid API ID format. Must be a valid UUID.".to_string())
        })?;
        if !self.store.delete(api_id).await? {
            return Err(AppError::NotFound("API not found".to_string()));
        }
        info!(api_id, "Deleted endpoint");
        Ok(())
    }

    async fn store_all(&self, endpoints: Vec<EndpointDescription>) -> Result<Vec<EndpointRecord>> {
        let mut records = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            records.push(self.store.put(endpoint).await?);
        }
        info!(count = records.len(), "Stored imported endpoints");
        Ok(records)
    }
}
