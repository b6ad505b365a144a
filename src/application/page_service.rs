// Page service - builds the view for each routed page
use crate::application::canvas::{CanvasRenderer, CanvasRequest};
use crate::application::dataset_service::CANVAS_ID;
use crate::application::state_store::{StateStore, StoreError};
use crate::domain::dashboard::{Dashboard, META_TITLE};
use crate::domain::dataset::DatasetCatalog;
use crate::domain::page::{relative_path, snapshot_edit_path, snapshot_path, Page};
use crate::domain::polling::PollingState;
use crate::infrastructure::config::{MetricOption, RealtimeSettings};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A page view together with the app header shown above every page
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub nav: Vec<NavLink>,
    #[serde(flatten)]
    pub view: PageView,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavLink {
    pub label: &'static str,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageView {
    Realtime(RealtimeView),
    Dashboard(DashboardView),
    Archive(ArchiveView),
    NotFound { message: String },
}

impl PageView {
    pub fn not_found() -> Self {
        PageView::NotFound {
            message: "404".to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PageView::NotFound { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeView {
    pub metrics: Vec<MetricOption>,
    pub selected_metric: Option<String>,
    pub update_frequency: String,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub snapshot_id: String,
    pub title: String,
    pub is_new: bool,
    pub show_mode: bool,
    pub menu: Vec<MenuItem>,
    pub controls: ControlCard,
    pub canvas: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MenuItem {
    pub id: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlCard {
    pub hidden: bool,
    pub title: String,
    pub dataset: DatasetControl,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetControl {
    pub value: String,
    pub disabled: bool,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveView {
    pub columns: Vec<ArchiveColumn>,
    pub rows: Vec<ArchiveRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveColumn {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveRow {
    pub snapshot_id: String,
    pub link: String,
    pub title: String,
    pub created_by: String,
    pub created_on: String,
}

#[derive(Clone)]
pub struct PageService {
    store: Arc<dyn StateStore>,
    renderer: Arc<dyn CanvasRenderer>,
    catalog: Arc<DatasetCatalog>,
    realtime: RealtimeSettings,
    base_path: String,
}

impl PageService {
    pub fn new(
        store: Arc<dyn StateStore>,
        renderer: Arc<dyn CanvasRenderer>,
        catalog: Arc<DatasetCatalog>,
        realtime: RealtimeSettings,
        base_path: String,
    ) -> Self {
        Self {
            store,
            renderer,
            catalog,
            realtime,
            base_path,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Header links, relative to the deployment base path
    pub fn nav(&self) -> Vec<NavLink> {
        [
            ("Stream", "/realtime"),
            ("New Dashboard", "/create"),
            ("Archive", "/archive"),
        ]
        .into_iter()
        .map(|(label, path)| NavLink {
            label,
            href: relative_path(&self.base_path, path),
        })
        .collect()
    }

    pub async fn render(&self, page: &Page) -> Result<PageResponse, StoreError> {
        Ok(PageResponse {
            nav: self.nav(),
            view: self.build(page).await?,
        })
    }

    pub async fn build(&self, page: &Page) -> Result<PageView, StoreError> {
        match page {
            Page::Realtime => Ok(PageView::Realtime(self.realtime_page())),
            Page::Create => Ok(PageView::Dashboard(self.dashboard_page(self.blank_dashboard(), false))),
            Page::Archive => Ok(PageView::Archive(self.archive_page().await?)),
            Page::Dashboard { id, editable } => match self.load_dashboard(id).await {
                Ok(dashboard) => Ok(PageView::Dashboard(self.dashboard_page(dashboard, !editable))),
                Err(e) if e.is_not_found() => {
                    tracing::info!("Dashboard {} not found", id);
                    Ok(PageView::not_found())
                }
                Err(e) => Err(e),
            },
            Page::NotFound => Ok(PageView::not_found()),
        }
    }

    fn realtime_page(&self) -> RealtimeView {
        let polling = PollingState {
            interval_seconds: (self.realtime.interval_ms / 1000).max(1),
            last_timestamp: None,
        };

        RealtimeView {
            metrics: self.realtime.metrics.clone(),
            selected_metric: self.realtime.default_metric().map(str::to_string),
            update_frequency: polling.interval_label(),
            interval_ms: self.realtime.interval_ms,
        }
    }

    fn blank_dashboard(&self) -> Dashboard {
        let dataset = self
            .catalog
            .default_dataset()
            .map(|d| d.name.clone())
            .unwrap_or_default();
        Dashboard::new_blank(dataset)
    }

    async fn load_dashboard(&self, id: &str) -> Result<Dashboard, StoreError> {
        let content = self.store.get(id).await?;
        let title = self
            .store
            .get_metadata(id, META_TITLE, Value::String(String::new()))
            .await?;
        let title = title.as_str().unwrap_or_default().to_string();

        Ok(Dashboard::saved(id.to_string(), title, content))
    }

    fn dashboard_page(&self, dashboard: Dashboard, show_mode: bool) -> DashboardView {
        let is_new = dashboard.is_new();

        let canvas = self.renderer.render(&CanvasRequest {
            dashboard_id: CANVAS_ID,
            content: &dashboard.content,
            dataset: self.catalog.get(&dashboard.content.connection_params),
            editable: !show_mode,
        });

        let menu = vec![
            MenuItem {
                id: "save",
                label: "Save",
                href: None,
                hidden: show_mode,
            },
            MenuItem {
                id: "fork",
                label: "Save a Copy",
                href: None,
                hidden: is_new || show_mode,
            },
            MenuItem {
                id: "delete",
                label: "Delete",
                href: None,
                hidden: is_new || show_mode,
            },
            MenuItem {
                id: "edit",
                label: "Edit",
                href: Some(snapshot_edit_path(&self.base_path, &dashboard.id)),
                hidden: !show_mode,
            },
            MenuItem {
                id: "archive",
                label: "Back to Archive",
                href: Some(relative_path(&self.base_path, "/archive")),
                hidden: false,
            },
        ];

        let controls = ControlCard {
            hidden: show_mode,
            title: dashboard.title.clone(),
            dataset: DatasetControl {
                value: dashboard.content.connection_params.clone(),
                disabled: !is_new,
                options: self.catalog.names(),
            },
        };

        DashboardView {
            snapshot_id: dashboard.id,
            title: dashboard.title,
            is_new,
            show_mode,
            menu,
            controls,
            canvas,
        }
    }

    async fn archive_page(&self) -> Result<ArchiveView, StoreError> {
        let rows = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|meta| ArchiveRow {
                link: snapshot_path(&self.base_path, &meta.dashboard_id),
                snapshot_id: meta.dashboard_id,
                title: meta.title,
                created_by: meta.owner,
                created_on: meta.created_time.to_rfc3339(),
            })
            .collect();

        Ok(ArchiveView {
            columns: vec![
                ArchiveColumn { id: "link", name: "Link" },
                ArchiveColumn { id: "title", name: "Title" },
                ArchiveColumn { id: "created_by", name: "Created By" },
                ArchiveColumn { id: "created_on", name: "Created On" },
            ],
            rows,
        })
    }
}
