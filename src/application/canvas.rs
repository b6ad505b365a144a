// Canvas renderer trait - turns dashboard elements into a UI tree
use crate::domain::dashboard::DashboardContent;
use crate::domain::dataset::DatasetHandle;
use serde_json::Value;

/// Everything a renderer needs to draw one dashboard canvas
#[derive(Debug, Clone)]
pub struct CanvasRequest<'a> {
    pub dashboard_id: &'a str,
    pub content: &'a DashboardContent,
    pub dataset: Option<&'a DatasetHandle>,
    pub editable: bool,
}

pub trait CanvasRenderer: Send + Sync {
    fn render(&self, request: &CanvasRequest<'_>) -> Value;
}
