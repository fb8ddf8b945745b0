use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use backmon_common::types::{Alert, Device};

use crate::api::{internal_error, message_response};
use crate::logging::TraceId;
use crate::state::AppState;

/// Every alert, newest first.
#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "Alerts",
    responses(
        (status = 200, description = "All alerts", body = Vec<Alert>)
    )
)]
async fn list_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.storage.get_alerts().await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => internal_error(&trace_id, "Failed to fetch alerts", e),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct RecentAlertsQuery {
    /// Maximum number of alerts to return.
    limit: Option<String>,
}

/// An alert enriched with its device, when it has one.
#[derive(Serialize, ToSchema)]
struct RecentAlert {
    #[serde(flatten)]
    alert: Alert,
    device: Option<Device>,
}

/// The N most recent alerts, each enriched with its device.
#[utoipa::path(
    get,
    path = "/api/recent-alerts",
    tag = "Alerts",
    params(RecentAlertsQuery),
    responses(
        (status = 200, description = "Most recent alerts", body = Vec<RecentAlert>),
        (status = 400, description = "Non-numeric limit", body = crate::api::ErrorBody)
    )
)]
async fn recent_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<RecentAlertsQuery>,
) -> impl IntoResponse {
    let limit = match params.limit.as_deref() {
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(limit) => limit,
            Err(_) => return message_response(StatusCode::BAD_REQUEST, "Invalid limit"),
        },
        None => state.config.recent_alerts_limit,
    };

    let alerts = match state.storage.get_recent_alerts(limit).await {
        Ok(alerts) => alerts,
        Err(e) => return internal_error(&trace_id, "Failed to fetch recent alerts", e),
    };

    let mut enriched = Vec::with_capacity(alerts.len());
    for alert in alerts {
        let device = match alert.device_id {
            Some(device_id) => match state.storage.get_device(device_id).await {
                Ok(device) => device,
                Err(e) => return internal_error(&trace_id, "Failed to fetch recent alerts", e),
            },
            None => None,
        };
        enriched.push(RecentAlert { alert, device });
    }
    Json(enriched).into_response()
}

/// Marks one alert as read. Safe to repeat.
#[utoipa::path(
    patch,
    path = "/api/alerts/{id}/read",
    tag = "Alerts",
    params(("id" = i32, Path, description = "Alert id")),
    responses(
        (status = 200, description = "The alert, now read", body = Alert),
        (status = 400, description = "Non-numeric id", body = crate::api::ErrorBody),
        (status = 404, description = "Unknown alert", body = crate::api::ErrorBody)
    )
)]
async fn mark_alert_read(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(alert_id) = id.parse::<i32>() else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid alert ID");
    };
    match state.storage.mark_alert_as_read(alert_id).await {
        Ok(Some(alert)) => Json(alert).into_response(),
        Ok(None) => message_response(StatusCode::NOT_FOUND, "Alert not found"),
        Err(e) => internal_error(&trace_id, "Failed to mark alert as read", e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_alerts))
        .routes(routes!(recent_alerts))
        .routes(routes!(mark_alert_read))
}
