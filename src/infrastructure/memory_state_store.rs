// In-memory snapshot store
use crate::application::state_store::{StateStore, StoreError};
use crate::domain::dashboard::{
    initial_metadata, new_dashboard_id, DashboardContent, DashboardMetadata, LAYOUT_KEY,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoredSnapshot {
    blobs: HashMap<String, String>,
    meta: Map<String, Value>,
}

/// Keeps dashboards for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    snapshots: RwLock<HashMap<String, StoredSnapshot>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn create(&self, content: &DashboardContent, owner: &str) -> Result<String, StoreError> {
        let blob = content.to_blob()?;
        let id = new_dashboard_id();

        let mut snapshot = StoredSnapshot {
            blobs: HashMap::new(),
            meta: initial_metadata(owner),
        };
        snapshot.blobs.insert(LAYOUT_KEY.to_string(), blob);

        self.snapshots.write().await.insert(id.clone(), snapshot);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<DashboardContent, StoreError> {
        let snapshots = self.snapshots.read().await;
        let blob = snapshots
            .get(id)
            .and_then(|s| s.blobs.get(LAYOUT_KEY))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(DashboardContent::from_blob(blob)?)
    }

    async fn overwrite(&self, id: &str, key: &str, blob: &str) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.write().await;
        let snapshot = snapshots
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        snapshot.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.snapshots.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn get_metadata(&self, id: &str, key: &str, default: Value) -> Result<Value, StoreError> {
        let snapshots = self.snapshots.read().await;
        let snapshot = snapshots
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(snapshot.meta.get(key).cloned().unwrap_or(default))
    }

    async fn update_metadata(&self, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.write().await;
        let snapshot = snapshots
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        snapshot.meta.extend(fields);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DashboardMetadata>, StoreError> {
        let snapshots = self.snapshots.read().await;
        let mut all: Vec<DashboardMetadata> = snapshots
            .iter()
            .map(|(id, s)| DashboardMetadata::from_fields(id, &s.meta))
            .collect();
        all.sort_by(|a, b| b.created_time.cmp(&a.created_time));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::{META_OWNER, META_TITLE};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = MemoryStateStore::new();
        let content = DashboardContent::blank("IoT Sensor Data");

        let id = store.create(&content, "dana").await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.get(&id).await.unwrap(), content);
        assert_eq!(
            store.get_metadata(&id, META_OWNER, json!("")).await.unwrap(),
            json!("dana")
        );

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap_err().is_not_found());
        assert!(store.delete(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_metadata_default_and_update() {
        let store = MemoryStateStore::new();
        let id = store
            .create(&DashboardContent::blank("IoT Sensor Data"), "dana")
            .await
            .unwrap();

        assert_eq!(
            store.get_metadata(&id, "colour", json!("none")).await.unwrap(),
            json!("none")
        );

        let mut fields = Map::new();
        fields.insert(META_TITLE.into(), json!("Morning walk"));
        store.update_metadata(&id, fields).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Morning walk");
        assert_eq!(listed[0].owner, "dana");
    }

    #[tokio::test]
    async fn test_overwrite_unknown_id() {
        let store = MemoryStateStore::new();
        let err = store.overwrite("nope", LAYOUT_KEY, "{}").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
