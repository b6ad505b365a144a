// Application state for HTTP handlers
use crate::application::dataset_service::DatasetService;
use crate::application::lifecycle_service::LifecycleService;
use crate::application::page_service::PageService;
use crate::application::polling_service::PollingService;

#[derive(Clone)]
pub struct AppState {
    pub page_service: PageService,
    pub lifecycle_service: LifecycleService,
    pub polling_service: PollingService,
    pub dataset_service: DatasetService,
}
