// SQLite-backed snapshot store
use crate::application::state_store::{StateStore, StoreError};
use crate::domain::dashboard::{
    initial_metadata, new_dashboard_id, DashboardContent, DashboardMetadata, LAYOUT_KEY,
    META_CREATED,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Statements run on the blocking pool; the connection is shared behind a mutex
#[derive(Clone)]
pub struct SqliteStateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStateStore {
    /// Create or open a snapshot database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS snapshots (
                id TEXT PRIMARY KEY,
                created_time TEXT NOT NULL,
                meta TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS snapshot_blobs (
                snapshot_id TEXT NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
                key TEXT NOT NULL,
                blob TEXT NOT NULL,
                PRIMARY KEY (snapshot_id, key)
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_created ON snapshots(created_time);
            ",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection off the async executor
    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("snapshot connection poisoned".to_string()))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("join error: {}", e)))?
    }

    fn read_meta(conn: &Connection, id: &str) -> Result<Map<String, Value>, StoreError> {
        let meta: Option<String> = conn
            .query_row("SELECT meta FROM snapshots WHERE id = ?", params![id], |row| {
                row.get(0)
            })
            .optional()?;

        let meta = meta.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&meta)?)
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn create(&self, content: &DashboardContent, owner: &str) -> Result<String, StoreError> {
        let blob = content.to_blob()?;
        let id = new_dashboard_id();
        let meta = initial_metadata(owner);
        let created = meta
            .get(META_CREATED)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let meta = serde_json::to_string(&meta)?;

        let row_id = id.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO snapshots (id, created_time, meta) VALUES (?, ?, ?)",
                params![row_id, created, meta],
            )?;
            tx.execute(
                "INSERT INTO snapshot_blobs (snapshot_id, key, blob) VALUES (?, ?, ?)",
                params![row_id, LAYOUT_KEY, blob],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        tracing::debug!("Created snapshot {}", id);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<DashboardContent, StoreError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            let blob: Option<String> = conn
                .query_row(
                    "SELECT blob FROM snapshot_blobs WHERE snapshot_id = ? AND key = ?",
                    params![id, LAYOUT_KEY],
                    |row| row.get(0),
                )
                .optional()?;

            let blob = blob.ok_or_else(|| StoreError::NotFound(id.clone()))?;
            Ok(DashboardContent::from_blob(&blob)?)
        })
        .await
    }

    async fn overwrite(&self, id: &str, key: &str, blob: &str) -> Result<(), StoreError> {
        let (id, key, blob) = (id.to_string(), key.to_string(), blob.to_string());
        self.blocking(move |conn| {
            let exists: Option<i64> = conn
                .query_row("SELECT 1 FROM snapshots WHERE id = ?", params![id], |row| {
                    row.get(0)
                })
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound(id));
            }

            conn.execute(
                "INSERT OR REPLACE INTO snapshot_blobs (snapshot_id, key, blob) VALUES (?, ?, ?)",
                params![id, key, blob],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM snapshot_blobs WHERE snapshot_id = ?", params![id])?;
            let removed = tx.execute("DELETE FROM snapshots WHERE id = ?", params![id])?;
            tx.commit()?;

            if removed == 0 {
                return Err(StoreError::NotFound(id));
            }
            tracing::debug!("Deleted snapshot {}", id);
            Ok(())
        })
        .await
    }

    async fn get_metadata(&self, id: &str, key: &str, default: Value) -> Result<Value, StoreError> {
        let (id, key) = (id.to_string(), key.to_string());
        self.blocking(move |conn| {
            let meta = Self::read_meta(conn, &id)?;
            Ok(meta.get(&key).cloned().unwrap_or(default))
        })
        .await
    }

    async fn update_metadata(&self, id: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let id = id.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let mut meta = Self::read_meta(&tx, &id)?;
            meta.extend(fields);
            tx.execute(
                "UPDATE snapshots SET meta = ? WHERE id = ?",
                params![serde_json::to_string(&meta)?, id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn list(&self) -> Result<Vec<DashboardMetadata>, StoreError> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, meta FROM snapshots ORDER BY created_time DESC")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut all = Vec::new();
            for row in rows {
                let (id, meta) = row?;
                let fields: Map<String, Value> = serde_json::from_str(&meta)?;
                all.push(DashboardMetadata::from_fields(&id, &fields));
            }
            Ok(all)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::META_TITLE;
    use serde_json::json;

    fn content() -> DashboardContent {
        DashboardContent {
            connection_params: "IoT Sensor Data".to_string(),
            elements: vec![json!({"type": "line", "x": "timestamp", "y": "NumSteps"})],
            arrangement: Some(json!({"type": "row"})),
        }
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots").join("snapshot-dev.db");

        let id = {
            let store = SqliteStateStore::open(&path).unwrap();
            store.create(&content(), "dana").await.unwrap()
        };

        let store = SqliteStateStore::open(&path).unwrap();
        assert_eq!(store.get(&id).await.unwrap(), content());
    }

    #[tokio::test]
    async fn test_overwrite_and_metadata() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let id = store.create(&content(), "dana").await.unwrap();

        let replacement = DashboardContent::blank("IoT Sensor Data");
        store
            .overwrite(&id, LAYOUT_KEY, &replacement.to_blob().unwrap())
            .await
            .unwrap();
        assert_eq!(store.get(&id).await.unwrap(), replacement);

        let mut fields = Map::new();
        fields.insert(META_TITLE.into(), json!("Calories"));
        store.update_metadata(&id, fields).await.unwrap();
        assert_eq!(
            store.get_metadata(&id, META_TITLE, json!("")).await.unwrap(),
            json!("Calories")
        );

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].dashboard_id, id);
        assert_eq!(listed[0].owner, "dana");
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_metadata() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let id = store.create(&content(), "dana").await.unwrap();

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap_err().is_not_found());
        assert!(store
            .get_metadata(&id, META_TITLE, json!(""))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        assert!(store.delete("missing").await.unwrap_err().is_not_found());
        assert!(store
            .overwrite("missing", LAYOUT_KEY, "{}")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_creates_on_runtime_workers() {
        let store = SqliteStateStore::open_in_memory().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.create(&content(), &format!("user-{}", i)).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 8);
        assert_eq!(store.list().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_blob_error() {
        let store = SqliteStateStore::open_in_memory().unwrap();
        let id = store.create(&content(), "dana").await.unwrap();
        store.overwrite(&id, LAYOUT_KEY, "not json").await.unwrap();

        let err = store.get(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::Blob(_)));
    }
}
