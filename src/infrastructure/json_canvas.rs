// Renders dashboard canvases as JSON trees for the browser editor
use crate::application::canvas::{CanvasRenderer, CanvasRequest};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default)]
pub struct JsonCanvasRenderer;

impl JsonCanvasRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn state_id(dashboard_id: &str) -> String {
        format!("{}-state", dashboard_id)
    }

    pub fn canvas_id(dashboard_id: &str) -> String {
        format!("{}-canvas", dashboard_id)
    }
}

impl CanvasRenderer for JsonCanvasRenderer {
    fn render(&self, request: &CanvasRequest<'_>) -> Value {
        let columns: Vec<&str> = request
            .dataset
            .map(|d| d.columns().iter().map(String::as_str).collect())
            .unwrap_or_default();
        let table = request.dataset.map(|d| d.table.as_str());

        json!({
            "dashboard_id": request.dashboard_id,
            "state": {
                "id": Self::state_id(request.dashboard_id),
                "connection_params": request.content.connection_params,
                "table": table,
                "columns": columns,
                "elements": request.content.elements,
            },
            "canvas": {
                "id": Self::canvas_id(request.dashboard_id),
                "arrangement": request.content.arrangement,
                "editable": request.editable,
            },
        })
    }
}
