// Router construction
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    change_dataset, health_check, lifecycle, realtime_stream, realtime_update, render_page,
    update_interval,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/lifecycle", post(lifecycle))
        .route("/dataset", post(change_dataset))
        .route("/polling/interval", post(update_interval))
        .route("/realtime", get(realtime_update))
        .route("/realtime/stream", get(realtime_stream));

    // Every other path is a page and goes through the page router
    Router::new()
        .route("/healthz", get(health_check))
        .nest("/api", api_routes)
        .fallback(render_page)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
