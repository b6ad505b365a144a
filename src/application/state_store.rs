// Snapshot store trait for persisted dashboards
use crate::domain::dashboard::{DashboardContent, DashboardMetadata};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dashboard {0} not found")]
    NotFound(String),

    #[error("invalid dashboard blob: {0}")]
    Blob(#[from] serde_json::Error),

    #[error("snapshot backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist a new dashboard and return its freshly assigned id
    async fn create(&self, content: &DashboardContent, owner: &str) -> Result<String, StoreError>;

    /// Load the content blob of a dashboard
    async fn get(&self, id: &str) -> Result<DashboardContent, StoreError>;

    /// Replace one blob of an existing dashboard in place
    async fn overwrite(&self, id: &str, key: &str, blob: &str) -> Result<(), StoreError>;

    /// Remove a dashboard together with its metadata
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Read one metadata field, falling back to `default` when unset
    async fn get_metadata(&self, id: &str, key: &str, default: Value) -> Result<Value, StoreError>;

    /// Merge `fields` into the dashboard's metadata
    async fn update_metadata(&self, id: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// All dashboards, newest first
    async fn list(&self) -> Result<Vec<DashboardMetadata>, StoreError>;
}
