// HTTP request handlers
use crate::application::lifecycle_service::{LifecycleOutcome, LifecycleRequest};
use crate::application::polling_service::PollingError;
use crate::domain::page::Page;
use crate::domain::polling::PollingState;
use crate::infrastructure::sse_stream::sse_from_receiver;
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const OWNER_HEADER: &str = "x-forwarded-user";

#[derive(Deserialize)]
pub struct RealtimeQuery {
    pub metric: Option<String>,
    pub interval_seconds: Option<u64>,
}

#[derive(Deserialize)]
pub struct StreamQuery {
    pub metric: Option<String>,
    pub interval_ms: Option<u64>,
}

#[derive(Deserialize)]
pub struct IntervalRequest {
    pub n_clicks: Option<u64>,
    #[serde(default)]
    pub state: PollingState,
}

#[derive(Deserialize)]
pub struct DatasetRequest {
    pub connection_params: String,
}

#[derive(Serialize)]
pub struct RedirectResponse {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Resolve the browser path to a page and return its view
pub async fn render_page(uri: Uri, State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let page = Page::resolve(Some(uri.path()), state.page_service.base_path());
    tracing::debug!("Routing {} to {:?}", uri.path(), page);

    let response = state.page_service.render(&page).await?;
    let status = if response.view.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };

    Ok((status, Json(response)).into_response())
}

/// Save, fork or delete the dashboard shown in the browser
pub async fn lifecycle(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(mut request): Json<LifecycleRequest>,
) -> Result<Response, ApiError> {
    if let Some(owner) = headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        request.owner = owner.to_string();
    }

    match state.lifecycle_service.handle(request).await? {
        LifecycleOutcome::Redirect {
            location,
            snapshot_id,
        } => Ok(Json(RedirectResponse {
            href: location,
            snapshot_id,
        })
        .into_response()),
        LifecycleOutcome::NoUpdate => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Replace the editable canvas with a blank one for another dataset
pub async fn change_dataset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DatasetRequest>,
) -> Result<Response, ApiError> {
    let canvas = state
        .dataset_service
        .switch_dataset(&request.connection_params)
        .ok_or_else(|| ApiError::NotFound(format!("dataset {}", request.connection_params)))?;

    Ok(Json(canvas).into_response())
}

/// Recalibrate the poll interval from the source's update frequency
pub async fn update_interval(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IntervalRequest>,
) -> Result<Response, ApiError> {
    match state
        .polling_service
        .recalibrate_interval(request.n_clicks, request.state)
        .await?
    {
        Some(update) => Ok(Json(update).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// One refresh of the realtime chart
pub async fn realtime_update(
    Query(query): Query<RealtimeQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let metric = selected_metric(&state, query.metric)?;
    let polling = match query.interval_seconds {
        Some(interval_seconds) => PollingState {
            interval_seconds,
            last_timestamp: None,
        },
        None => PollingState::default(),
    };

    let update = state.polling_service.refresh(&metric, polling).await?;
    Ok(Json(update).into_response())
}

/// Push a refreshed chart on every poll tick
pub async fn realtime_stream(
    Query(query): Query<StreamQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let metric = selected_metric(&state, query.metric)?;
    let interval = query
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| state.polling_service.default_interval());

    tracing::info!("Starting live stream for {} every {:?}", metric, interval);

    let rx = state.polling_service.stream_updates(metric, interval);
    Ok(sse_from_receiver(rx, "update").into_response())
}

fn selected_metric(state: &AppState, metric: Option<String>) -> Result<String, PollingError> {
    let metric = metric
        .or_else(|| state.polling_service.default_metric().map(str::to_string))
        .unwrap_or_default();
    state.polling_service.check_metric(&metric)?;
    Ok(metric)
}
