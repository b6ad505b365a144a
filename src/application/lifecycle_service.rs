// Lifecycle service - save, fork and delete transitions for dashboards
use crate::application::state_store::{StateStore, StoreError};
use crate::domain::dashboard::{DashboardContent, LAYOUT_KEY, META_TITLE};
use crate::domain::page::{relative_path, snapshot_path};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

pub const ANONYMOUS_OWNER: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Save,
    Fork,
    Delete,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleAction::Save => "save",
            LifecycleAction::Fork => "fork",
            LifecycleAction::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One lifecycle callback: the control that fired plus the dashboard as
/// currently shown in the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleRequest {
    #[serde(default)]
    pub triggered_id: Option<String>,
    #[serde(default)]
    pub save_clicks: Option<u64>,
    #[serde(default)]
    pub fork_clicks: Option<u64>,
    #[serde(default)]
    pub delete_clicks: Option<u64>,
    #[serde(default)]
    pub elements: Vec<Value>,
    #[serde(default)]
    pub arrangement: Option<Value>,
    #[serde(default)]
    pub snapshot_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub connection_params: String,
    #[serde(skip, default = "anonymous")]
    pub owner: String,
}

fn anonymous() -> String {
    ANONYMOUS_OWNER.to_string()
}

impl LifecycleRequest {
    /// The action to run, if the control that fired has actually been clicked
    pub fn action(&self) -> Option<LifecycleAction> {
        let (action, clicks) = match self.triggered_id.as_deref()? {
            "save" => (LifecycleAction::Save, self.save_clicks),
            "fork" => (LifecycleAction::Fork, self.fork_clicks),
            "delete" => (LifecycleAction::Delete, self.delete_clicks),
            _ => return None,
        };

        match clicks {
            Some(n) if n > 0 => Some(action),
            _ => None,
        }
    }

    fn content(&self) -> DashboardContent {
        DashboardContent {
            connection_params: self.connection_params.clone(),
            elements: self.elements.clone(),
            arrangement: self.arrangement.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleOutcome {
    /// Navigate the browser; `snapshot_id` is the dashboard now shown, if any
    Redirect {
        location: String,
        snapshot_id: Option<String>,
    },
    NoUpdate,
}

#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn StateStore>,
    base_path: String,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn StateStore>, base_path: String) -> Self {
        Self { store, base_path }
    }

    pub async fn handle(&self, request: LifecycleRequest) -> Result<LifecycleOutcome, StoreError> {
        let Some(action) = request.action() else {
            tracing::debug!(
                "Ignoring lifecycle callback for trigger {:?}",
                request.triggered_id
            );
            return Ok(LifecycleOutcome::NoUpdate);
        };

        tracing::info!(
            "{} action triggered for dashboard {:?}",
            action,
            request.snapshot_id
        );

        let content = request.content();
        let snapshot_id = match action {
            LifecycleAction::Save if request.snapshot_id.is_empty() => {
                self.store.create(&content, &request.owner).await?
            }
            LifecycleAction::Save => {
                // A saved dashboard stays bound to the dataset it was created on
                let stored = self.store.get(&request.snapshot_id).await?;
                if stored.connection_params != content.connection_params {
                    tracing::warn!(
                        "Ignoring dataset change {:?} -> {:?} for dashboard {}",
                        stored.connection_params,
                        content.connection_params,
                        request.snapshot_id
                    );
                }
                let content = DashboardContent {
                    connection_params: stored.connection_params,
                    ..content
                };
                self.store
                    .overwrite(&request.snapshot_id, LAYOUT_KEY, &content.to_blob()?)
                    .await?;
                request.snapshot_id.clone()
            }
            LifecycleAction::Fork => self.store.create(&content, &request.owner).await?,
            LifecycleAction::Delete => {
                self.store.delete(&request.snapshot_id).await?;
                return Ok(LifecycleOutcome::Redirect {
                    location: relative_path(&self.base_path, "/archive"),
                    snapshot_id: None,
                });
            }
        };

        let mut fields = Map::new();
        fields.insert(META_TITLE.to_string(), Value::String(request.title.clone()));
        self.store.update_metadata(&snapshot_id, fields).await?;

        Ok(LifecycleOutcome::Redirect {
            location: snapshot_path(&self.base_path, &snapshot_id),
            snapshot_id: Some(snapshot_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_state_store::MemoryStateStore;
    use serde_json::json;

    fn request(trigger: &str, snapshot_id: &str, title: &str) -> LifecycleRequest {
        LifecycleRequest {
            triggered_id: Some(trigger.to_string()),
            save_clicks: Some(1),
            fork_clicks: Some(1),
            delete_clicks: Some(1),
            elements: vec![json!({"type": "scatter", "x": "timestamp", "y": "NumSteps"})],
            arrangement: Some(json!({"type": "grid"})),
            snapshot_id: snapshot_id.to_string(),
            title: title.to_string(),
            connection_params: "IoT Sensor Data".to_string(),
            owner: "dana".to_string(),
        }
    }

    fn setup() -> (Arc<MemoryStateStore>, LifecycleService) {
        let store = Arc::new(MemoryStateStore::new());
        let service = LifecycleService::new(store.clone(), "/".to_string());
        (store, service)
    }

    fn redirected_id(outcome: LifecycleOutcome) -> String {
        match outcome {
            LifecycleOutcome::Redirect {
                location,
                snapshot_id: Some(id),
            } => {
                assert_eq!(location, format!("/snapshot-{}", id));
                id
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    async fn title_of(store: &MemoryStateStore, id: &str) -> Value {
        store.get_metadata(id, META_TITLE, json!("")).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_new_assigns_id_and_title() {
        let (store, service) = setup();

        let id = redirected_id(service.handle(request("save", "", "Steps")).await.unwrap());

        assert!(!id.is_empty());
        assert_eq!(title_of(&store, &id).await, json!("Steps"));
        assert_eq!(store.get(&id).await.unwrap().elements.len(), 1);
    }

    #[tokio::test]
    async fn test_save_existing_keeps_id() {
        let (store, service) = setup();
        let id = redirected_id(service.handle(request("save", "", "Steps")).await.unwrap());

        let mut update = request("save", &id, "Steps v2");
        update.elements.clear();
        let after = redirected_id(service.handle(update).await.unwrap());

        assert_eq!(after, id);
        assert!(store.get(&id).await.unwrap().elements.is_empty());
        assert_eq!(title_of(&store, &id).await, json!("Steps v2"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_existing_keeps_dataset_binding() {
        let (store, service) = setup();
        let id = redirected_id(service.handle(request("save", "", "Steps")).await.unwrap());

        let mut rebind = request("save", &id, "Steps");
        rebind.connection_params = "Some Other Dataset".to_string();
        rebind.elements.push(json!({"type": "bar"}));
        let after = redirected_id(service.handle(rebind).await.unwrap());

        let stored = store.get(&after).await.unwrap();
        assert_eq!(after, id);
        assert_eq!(stored.connection_params, "IoT Sensor Data");
        assert_eq!(stored.elements.len(), 2);
    }

    #[tokio::test]
    async fn test_save_unknown_id_is_not_found() {
        let (store, service) = setup();

        let err = service.handle(request("save", "missing", "Steps")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fork_leaves_original_untouched() {
        let (store, service) = setup();
        let original = redirected_id(service.handle(request("save", "", "Steps")).await.unwrap());
        let before = store.get(&original).await.unwrap();

        let mut fork = request("fork", &original, "Steps copy");
        fork.elements.push(json!({"type": "bar"}));
        let copy = redirected_id(service.handle(fork).await.unwrap());

        assert_ne!(copy, original);
        assert_eq!(store.get(&original).await.unwrap(), before);
        assert_eq!(store.get(&copy).await.unwrap().elements.len(), 2);
        assert_eq!(title_of(&store, &original).await, json!("Steps"));
        assert_eq!(title_of(&store, &copy).await, json!("Steps copy"));
    }

    #[tokio::test]
    async fn test_fork_unchanged_content_still_creates() {
        let (store, service) = setup();
        let original = redirected_id(service.handle(request("save", "", "Steps")).await.unwrap());

        let copy = redirected_id(service.handle(request("fork", &original, "Steps")).await.unwrap());

        assert_ne!(copy, original);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_redirects_to_archive() {
        let (store, service) = setup();
        let id = redirected_id(service.handle(request("save", "", "Steps")).await.unwrap());

        let outcome = service.handle(request("delete", &id, "ignored")).await.unwrap();

        assert_eq!(
            outcome,
            LifecycleOutcome::Redirect {
                location: "/archive".to_string(),
                snapshot_id: None
            }
        );
        assert!(store.get(&id).await.unwrap_err().is_not_found());
        assert!(store
            .get_metadata(&id, META_TITLE, json!(""))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_no_trigger_is_no_update() {
        let (store, service) = setup();

        let mut no_trigger = request("save", "", "Steps");
        no_trigger.triggered_id = None;
        assert_eq!(service.handle(no_trigger).await.unwrap(), LifecycleOutcome::NoUpdate);

        let unknown = request("dashboard-title", "", "Steps");
        assert_eq!(service.handle(unknown).await.unwrap(), LifecycleOutcome::NoUpdate);

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_clicks_is_no_update() {
        let (store, service) = setup();

        let mut zero = request("save", "", "Steps");
        zero.save_clicks = Some(0);
        assert_eq!(service.handle(zero).await.unwrap(), LifecycleOutcome::NoUpdate);

        let mut missing = request("fork", "", "Steps");
        missing.fork_clicks = None;
        assert_eq!(service.handle(missing).await.unwrap(), LifecycleOutcome::NoUpdate);

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redirects_respect_base_path() {
        let store = Arc::new(MemoryStateStore::new());
        let service = LifecycleService::new(store, "/iot/".to_string());

        let outcome = service.handle(request("save", "", "Steps")).await.unwrap();
        let LifecycleOutcome::Redirect { location, .. } = outcome else {
            panic!("expected redirect");
        };
        assert!(location.starts_with("/iot/snapshot-"));
    }
}
