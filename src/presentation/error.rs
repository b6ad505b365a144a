// HTTP error mapping
use crate::application::polling_service::PollingError;
use crate::application::state_store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Polling(#[from] PollingError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "DASHBOARD_NOT_FOUND"),
            // Request bodies are validated by the Json extractor, so this is stored data
            ApiError::Store(StoreError::Blob(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPT_DASHBOARD"),
            ApiError::Store(StoreError::Backend(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
            ApiError::Polling(PollingError::UnknownMetric(_)) => (StatusCode::BAD_REQUEST, "UNKNOWN_METRIC"),
            ApiError::Polling(PollingError::NoUpdateHistory) | ApiError::Polling(PollingError::Chart(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_RESULT")
            }
            ApiError::Polling(PollingError::Query(_)) => (StatusCode::BAD_GATEWAY, "QUERY_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error_code = %code, "{}", self);
        } else {
            tracing::debug!(error_code = %code, "{}", self);
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::ChartError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::NotFound("dataset".into()), StatusCode::NOT_FOUND),
            (ApiError::Store(StoreError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (ApiError::Store(StoreError::Backend("disk".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::Store(StoreError::Blob(
                    serde_json::from_str::<serde_json::Value>("not json").unwrap_err(),
                )),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::Polling(PollingError::UnknownMetric("Miles".into())), StatusCode::BAD_REQUEST),
            (ApiError::Polling(PollingError::NoUpdateHistory), StatusCode::UNPROCESSABLE_ENTITY),
            (ApiError::Polling(PollingError::Chart(ChartError::EmptyRows)), StatusCode::UNPROCESSABLE_ENTITY),
            (
                ApiError::Polling(PollingError::Query(anyhow::anyhow!("timeout"))),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
