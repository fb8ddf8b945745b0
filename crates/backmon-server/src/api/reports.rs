use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use backmon_common::report::ReportSubmission;
use backmon_common::types::{BackupReport, BackupStatus, DateRange, Device};
use backmon_storage::{IngestOutcome, ReportFilters};

use crate::api::{internal_error, message_response, validation_failure};
use crate::logging::TraceId;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ReportQuery {
    /// Exact status match (success / warning / failed).
    status: Option<String>,
    /// Relative window over event time (24h / 3d / 7d / 30d).
    #[serde(rename = "dateRange")]
    #[param(rename = "dateRange")]
    date_range: Option<String>,
    /// Exact device-type match (e.g. server / workstation).
    #[serde(rename = "deviceType")]
    #[param(rename = "deviceType")]
    device_type: Option<String>,
}

/// Filtered report history, most recent first.
#[utoipa::path(
    get,
    path = "/api/backup-reports",
    tag = "Backup Reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Matching reports", body = Vec<BackupReport>),
        (status = 400, description = "Unknown filter value", body = crate::api::ErrorBody)
    )
)]
async fn list_backup_reports(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ReportQuery>,
) -> impl IntoResponse {
    let mut filters = ReportFilters::default();
    if let Some(ref status) = params.status {
        match status.parse::<BackupStatus>() {
            Ok(parsed) => filters.status = Some(parsed),
            Err(_) => return message_response(StatusCode::BAD_REQUEST, "Invalid status filter"),
        }
    }
    if let Some(ref range) = params.date_range {
        match range.parse::<DateRange>() {
            Ok(parsed) => filters.date_range = Some(parsed),
            Err(_) => return message_response(StatusCode::BAD_REQUEST, "Invalid dateRange filter"),
        }
    }
    filters.device_type = params.device_type.clone();

    match state.storage.get_backup_reports(&filters).await {
        Ok(reports) => Json(reports).into_response(),
        Err(e) => internal_error(&trace_id, "Failed to fetch backup reports", e),
    }
}

/// A latest-per-device entry, enriched with its owning device.
#[derive(Serialize, ToSchema)]
struct LatestBackup {
    #[serde(flatten)]
    report: BackupReport,
    device: Option<Device>,
}

/// Latest report per device; devices that never reported are absent.
#[utoipa::path(
    get,
    path = "/api/latest-backups",
    tag = "Backup Reports",
    responses(
        (status = 200, description = "Latest report per device", body = Vec<LatestBackup>)
    )
)]
async fn latest_backups(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let reports = match state.storage.get_latest_backup_report_per_device().await {
        Ok(reports) => reports,
        Err(e) => return internal_error(&trace_id, "Failed to fetch latest backups", e),
    };

    let mut enriched = Vec::with_capacity(reports.len());
    for report in reports {
        let device = match state.storage.get_device(report.device_id).await {
            Ok(device) => device,
            Err(e) => return internal_error(&trace_id, "Failed to fetch latest backups", e),
        };
        enriched.push(LatestBackup { report, device });
    }
    Json(enriched).into_response()
}

#[derive(Serialize, ToSchema)]
struct ReportAccepted {
    message: String,
    #[serde(flatten)]
    outcome: IngestOutcome,
}

/// Ingestion entrypoint for backup agents.
///
/// Validates the submission, find-or-creates the device, persists the
/// report, and raises an alert for warning/failed statuses.
#[utoipa::path(
    post,
    path = "/api/backup/report",
    tag = "Backup Reports",
    request_body = Value,
    responses(
        (status = 201, description = "Report ingested", body = ReportAccepted),
        (status = 400, description = "Validation failure with per-field detail", body = crate::api::ErrorBody),
        (status = 401, description = "API key required and not valid", body = crate::api::ErrorBody)
    )
)]
async fn submit_report(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    let submission = match ReportSubmission::parse(&payload) {
        Ok(submission) => submission,
        Err(errors) => {
            tracing::warn!(
                trace_id = %trace_id,
                error_count = errors.0.len(),
                "rejected backup report: {errors}"
            );
            return validation_failure(errors.0);
        }
    };

    if state.config.require_api_key {
        let valid = match submission.api_key.as_deref() {
            Some(key) => match state.storage.validate_api_key(key).await {
                Ok(valid) => valid,
                Err(e) => return internal_error(&trace_id, "Failed to process backup report", e),
            },
            None => false,
        };
        if !valid {
            return message_response(StatusCode::UNAUTHORIZED, "Invalid or missing API key");
        }
    }

    match state.storage.process_report(submission).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(ReportAccepted {
                message: "Backup report received successfully".to_string(),
                outcome,
            }),
        )
            .into_response(),
        Err(e) => internal_error(&trace_id, "Failed to process backup report", e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_backup_reports))
        .routes(routes!(latest_backups))
        .routes(routes!(submit_report))
}
