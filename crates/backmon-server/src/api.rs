pub mod alerts;
pub mod dashboard;
pub mod devices;
pub mod keys;
pub mod reports;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use backmon_common::report::FieldError;

use crate::state::AppState;

/// Error payload shared by every endpoint; `errors` carries the
/// per-field detail for validation failures only.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

pub(crate) fn message_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
            errors: None,
        }),
    )
        .into_response()
}

pub(crate) fn validation_failure(errors: Vec<FieldError>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: "Invalid backup report data".to_string(),
            errors: Some(errors),
        }),
    )
        .into_response()
}

/// Logs the failure with its trace id and answers with the opaque
/// message only; internal detail never leaves the process.
pub(crate) fn internal_error(
    trace_id: &str,
    message: &str,
    err: impl std::fmt::Display,
) -> Response {
    tracing::error!(trace_id = %trace_id, error = %err, "{message}");
    message_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
}

/// Service liveness and uptime.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (Utc::now() - state.start_time).num_seconds(),
    })
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .merge(dashboard::routes())
        .merge(devices::routes())
        .merge(reports::routes())
        .merge(alerts::routes())
        .merge(keys::routes())
}
