use axum::extract::{Extension, State};
use axum::response::IntoResponse;
use axum::Json;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::internal_error;
use crate::logging::TraceId;
use crate::state::AppState;

/// Dashboard counters: total devices plus the latest-backup status
/// breakdown. Devices that never reported count toward the total only.
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = backmon_storage::DashboardStats)
    )
)]
async fn dashboard_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.storage.get_dashboard_stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => internal_error(&trace_id, "Failed to fetch dashboard statistics", e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(dashboard_stats))
}
