use crate::state::AppState;
use crate::{api, logging};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "backmon API",
        description = "Backup monitoring dashboard REST API",
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Dashboard", description = "Aggregated dashboard statistics"),
        (name = "Devices", description = "Monitored devices"),
        (name = "Backup Reports", description = "Report ingestion and history"),
        (name = "Alerts", description = "Alerts derived from non-success reports"),
        (name = "API Keys", description = "Agent credential management")
    )
)]
struct ApiDoc;

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn build_http_app(state: AppState) -> Router {
    let (router, api_spec) = api::routes().split_for_parts();

    let mut spec = ApiDoc::openapi();
    spec.merge(api_spec);

    let cors = cors_layer(&state);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api/openapi.json", spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
