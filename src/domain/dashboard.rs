// Dashboard domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Blob key under which dashboard content is stored
pub const LAYOUT_KEY: &str = "layout-json";

/// Metadata keys understood by the archive
pub const META_TITLE: &str = "title";
pub const META_OWNER: &str = "username";
pub const META_CREATED: &str = "created_time";

/// The persisted part of a dashboard. Elements and arrangement are only
/// ever written together through this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardContent {
    pub connection_params: String,
    #[serde(default)]
    pub elements: Vec<Value>,
    #[serde(default)]
    pub arrangement: Option<Value>,
}

impl DashboardContent {
    pub fn blank(connection_params: impl Into<String>) -> Self {
        Self {
            connection_params: connection_params.into(),
            elements: Vec::new(),
            arrangement: None,
        }
    }

    pub fn to_blob(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_blob(blob: &str) -> serde_json::Result<Self> {
        serde_json::from_str(blob)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// Empty until the store assigns one on first save
    pub id: String,
    pub title: String,
    pub content: DashboardContent,
}

impl Dashboard {
    pub fn new_blank(connection_params: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            content: DashboardContent::blank(connection_params),
        }
    }

    pub fn saved(id: String, title: String, content: DashboardContent) -> Self {
        Self { id, title, content }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }
}

/// Fresh dashboard id, unique across stores
pub fn new_dashboard_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Metadata every new dashboard starts with
pub fn initial_metadata(owner: &str) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert(META_TITLE.to_string(), Value::String(String::new()));
    meta.insert(META_OWNER.to_string(), Value::String(owner.to_string()));
    meta.insert(
        META_CREATED.to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    meta
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetadata {
    pub dashboard_id: String,
    pub title: String,
    pub owner: String,
    pub created_time: DateTime<Utc>,
}

impl DashboardMetadata {
    /// Build the typed view from a stored field map
    pub fn from_fields(dashboard_id: &str, fields: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let created_time = fields
            .get(META_CREATED)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();

        Self {
            dashboard_id: dashboard_id.to_string(),
            title: text(META_TITLE),
            owner: text(META_OWNER),
            created_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_dashboard_is_new() {
        let dashboard = Dashboard::new_blank("IoT Sensor Data");
        assert!(dashboard.is_new());
        assert!(dashboard.content.elements.is_empty());
        assert_eq!(dashboard.content.arrangement, None);
    }

    #[test]
    fn test_blob_keeps_elements_and_arrangement_together() {
        let content = DashboardContent {
            connection_params: "IoT Sensor Data".to_string(),
            elements: vec![json!({"type": "bar", "x": "device_id"})],
            arrangement: Some(json!({"type": "grid", "cols": 2})),
        };

        let blob = content.to_blob().unwrap();
        let restored = DashboardContent::from_blob(&blob).unwrap();
        assert_eq!(restored, content);
    }

    #[test]
    fn test_metadata_from_fields() {
        let mut fields = Map::new();
        fields.insert(META_TITLE.into(), json!("Steps by device"));
        fields.insert(META_OWNER.into(), json!("dana"));
        fields.insert(META_CREATED.into(), json!("2024-03-01T10:15:00Z"));

        let meta = DashboardMetadata::from_fields("abc", &fields);
        assert_eq!(meta.dashboard_id, "abc");
        assert_eq!(meta.title, "Steps by device");
        assert_eq!(meta.owner, "dana");
        assert_eq!(meta.created_time.to_rfc3339(), "2024-03-01T10:15:00+00:00");
    }

    #[test]
    fn test_initial_metadata_reads_back_as_untitled() {
        let fields = initial_metadata("dana");
        let meta = DashboardMetadata::from_fields(&new_dashboard_id(), &fields);
        assert_eq!(meta.title, "");
        assert_eq!(meta.owner, "dana");
        assert_ne!(meta.created_time, DateTime::<Utc>::default());
        assert_ne!(new_dashboard_id(), new_dashboard_id());
    }
}
