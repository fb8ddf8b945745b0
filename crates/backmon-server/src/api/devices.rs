use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::{internal_error, message_response};
use crate::logging::TraceId;
use crate::state::AppState;

/// Lists every registered device.
#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "Devices",
    responses(
        (status = 200, description = "All devices", body = Vec<backmon_common::types::Device>)
    )
)]
async fn list_devices(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.storage.get_devices().await {
        Ok(devices) => Json(devices).into_response(),
        Err(e) => internal_error(&trace_id, "Failed to fetch devices", e),
    }
}

/// Fetches one device by id.
#[utoipa::path(
    get,
    path = "/api/devices/{id}",
    tag = "Devices",
    params(("id" = i32, Path, description = "Device id")),
    responses(
        (status = 200, description = "The device", body = backmon_common::types::Device),
        (status = 400, description = "Non-numeric id", body = crate::api::ErrorBody),
        (status = 404, description = "Unknown device", body = crate::api::ErrorBody)
    )
)]
async fn get_device(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(device_id) = id.parse::<i32>() else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid device ID");
    };
    match state.storage.get_device(device_id).await {
        Ok(Some(device)) => Json(device).into_response(),
        Ok(None) => message_response(StatusCode::NOT_FOUND, "Device not found"),
        Err(e) => internal_error(&trace_id, "Failed to fetch device", e),
    }
}

/// Full report history for one device, newest first.
#[utoipa::path(
    get,
    path = "/api/devices/{id}/backup-reports",
    tag = "Devices",
    params(("id" = i32, Path, description = "Device id")),
    responses(
        (status = 200, description = "Reports for the device", body = Vec<backmon_common::types::BackupReport>),
        (status = 400, description = "Non-numeric id", body = crate::api::ErrorBody),
        (status = 404, description = "Unknown device", body = crate::api::ErrorBody)
    )
)]
async fn device_backup_reports(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(device_id) = id.parse::<i32>() else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid device ID");
    };
    match state.storage.get_device(device_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return message_response(StatusCode::NOT_FOUND, "Device not found"),
        Err(e) => return internal_error(&trace_id, "Failed to fetch device backup reports", e),
    }
    match state.storage.get_backup_reports_by_device(device_id).await {
        Ok(reports) => Json(reports).into_response(),
        Err(e) => internal_error(&trace_id, "Failed to fetch device backup reports", e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_devices))
        .routes(routes!(get_device))
        .routes(routes!(device_backup_reports))
}
