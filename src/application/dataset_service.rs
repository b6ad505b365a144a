// Dataset service - catalog loading and switching the editable canvas
use crate::application::canvas::{CanvasRenderer, CanvasRequest};
use crate::application::warehouse_repository::WarehouseRepository;
use crate::domain::dashboard::DashboardContent;
use crate::domain::dataset::{DatasetCatalog, DatasetHandle};
use crate::infrastructure::config::{prepare_query, DatasetConfig};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Id of the single canvas a dashboard page edits
pub const CANVAS_ID: &str = "db";

/// Load every configured dataset once with the fixed-window query
pub async fn load_catalog(
    repository: &dyn WarehouseRepository,
    datasets: &[DatasetConfig],
    query_template: &str,
) -> anyhow::Result<DatasetCatalog> {
    let mut handles = Vec::with_capacity(datasets.len());

    for dataset in datasets {
        let mut vars = HashMap::new();
        vars.insert("table".to_string(), dataset.table.clone());
        vars.insert("limit".to_string(), dataset.limit.to_string());
        let query = prepare_query(query_template, &vars);

        let preview = repository.query_rows(&query).await?;
        tracing::info!(
            "Loaded dataset {} ({} rows, {} columns)",
            dataset.name,
            preview.rows.len(),
            preview.columns.len()
        );

        handles.push(DatasetHandle::new(
            dataset.name.clone(),
            dataset.table.clone(),
            preview,
        ));
    }

    Ok(DatasetCatalog::new(handles))
}

#[derive(Clone)]
pub struct DatasetService {
    catalog: Arc<DatasetCatalog>,
    renderer: Arc<dyn CanvasRenderer>,
}

impl DatasetService {
    pub fn new(catalog: Arc<DatasetCatalog>, renderer: Arc<dyn CanvasRenderer>) -> Self {
        Self { catalog, renderer }
    }

    /// Rebuild the editable canvas for a newly selected dataset.
    /// Previously placed elements are discarded. Returns `None` for an
    /// unknown dataset.
    pub fn switch_dataset(&self, connection_params: &str) -> Option<Value> {
        let dataset = self.catalog.get(connection_params)?;
        let content = DashboardContent::blank(connection_params);

        tracing::debug!("Switching canvas to dataset {}", connection_params);

        Some(self.renderer.render(&CanvasRequest {
            dashboard_id: CANVAS_ID,
            content: &content,
            dataset: Some(dataset),
            editable: true,
        }))
    }
}
