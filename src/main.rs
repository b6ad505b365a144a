// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::dataset_service::{load_catalog, DatasetService};
use crate::application::lifecycle_service::LifecycleService;
use crate::application::page_service::PageService;
use crate::application::polling_service::PollingService;
use crate::application::state_store::StateStore;
use crate::infrastructure::config::{load_app_config, SnapshotBackend};
use crate::infrastructure::databricks_repository::DatabricksRepository;
use crate::infrastructure::json_canvas::JsonCanvasRenderer;
use crate::infrastructure::memory_state_store::MemoryStateStore;
use crate::infrastructure::sqlite_state_store::SqliteStateStore;
use crate::presentation::app_state::AppState;
use crate::presentation::routes::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create repositories (infrastructure layer)
    let warehouse_id = config
        .warehouse
        .warehouse_id()
        .ok_or_else(|| anyhow::anyhow!("HTTP_PATH does not name a SQL warehouse"))?
        .to_string();
    let repository = Arc::new(DatabricksRepository::new(
        config.warehouse.host.clone(),
        config.warehouse.token.clone(),
        warehouse_id,
        config.warehouse.wait_timeout_secs,
    ));

    let store: Arc<dyn StateStore> = match config.snapshots.backend()? {
        SnapshotBackend::Sqlite(path) => {
            tracing::info!("Using snapshot database {}", path.display());
            Arc::new(SqliteStateStore::open(&path)?)
        }
        SnapshotBackend::SqliteInMemory => {
            tracing::warn!("Using an in-memory snapshot database, dashboards will not survive a restart");
            Arc::new(SqliteStateStore::open_in_memory()?)
        }
        SnapshotBackend::Memory => {
            tracing::warn!("Using in-memory snapshot store, dashboards will not survive a restart");
            Arc::new(MemoryStateStore::new())
        }
    };

    let catalog = Arc::new(
        load_catalog(repository.as_ref(), &config.datasets, &config.queries.dataset).await?,
    );
    let renderer = Arc::new(JsonCanvasRenderer::new());
    let base_path = config.server.base_path.clone();

    // Create services (application layer)
    let page_service = PageService::new(
        store.clone(),
        renderer.clone(),
        catalog.clone(),
        config.realtime.clone(),
        base_path.clone(),
    );
    let lifecycle_service = LifecycleService::new(store, base_path);
    let polling_service = PollingService::new(repository, config.realtime.clone(), config.queries.clone());
    let dataset_service = DatasetService::new(catalog, renderer);

    // Create application state
    let state = Arc::new(AppState {
        page_service,
        lifecycle_service,
        polling_service,
        dataset_service,
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting sensor-dashboards service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
