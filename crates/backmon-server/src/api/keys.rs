use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use std::fmt::Write;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use backmon_common::types::ApiKey;
use backmon_storage::{ApiKeyUpdate, NewApiKey};

use crate::api::{internal_error, message_response};
use crate::logging::TraceId;
use crate::state::AppState;

/// Generate a 64-character hex key (32 random bytes).
fn generate_key() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Lists all API keys.
#[utoipa::path(
    get,
    path = "/api/keys",
    tag = "API Keys",
    responses(
        (status = 200, description = "All API keys", body = Vec<ApiKey>)
    )
)]
async fn list_api_keys(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.storage.get_api_keys().await {
        Ok(keys) => Json(keys).into_response(),
        Err(e) => internal_error(&trace_id, "Failed to fetch API keys", e),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct CreateApiKeyRequest {
    name: String,
    /// Omit to have the server generate one.
    key: Option<String>,
    device_id: Option<i32>,
    expires_at: Option<DateTime<Utc>>,
    is_active: Option<bool>,
}

/// Creates an API key, generating the secret when none is supplied.
#[utoipa::path(
    post,
    path = "/api/keys",
    tag = "API Keys",
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "The created key", body = ApiKey),
        (status = 400, description = "Blank name", body = crate::api::ErrorBody)
    )
)]
async fn create_api_key(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateApiKeyRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return message_response(StatusCode::BAD_REQUEST, "API key name cannot be empty");
    }
    let new_key = NewApiKey {
        key: req.key.unwrap_or_else(generate_key),
        name: req.name,
        device_id: req.device_id,
        expires_at: req.expires_at,
        is_active: req.is_active.unwrap_or(true),
    };
    match state.storage.create_api_key(new_key).await {
        Ok(api_key) => (StatusCode::CREATED, Json(api_key)).into_response(),
        Err(e) => internal_error(&trace_id, "Failed to create API key", e),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct UpdateApiKeyRequest {
    name: Option<String>,
    device_id: Option<i32>,
    expires_at: Option<DateTime<Utc>>,
    is_active: Option<bool>,
}

/// Updates an API key; unset fields are left unchanged.
#[utoipa::path(
    patch,
    path = "/api/keys/{id}",
    tag = "API Keys",
    params(("id" = i32, Path, description = "API key id")),
    request_body = UpdateApiKeyRequest,
    responses(
        (status = 200, description = "The updated key", body = ApiKey),
        (status = 400, description = "Non-numeric id", body = crate::api::ErrorBody),
        (status = 404, description = "Unknown key", body = crate::api::ErrorBody)
    )
)]
async fn update_api_key(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateApiKeyRequest>,
) -> impl IntoResponse {
    let Ok(key_id) = id.parse::<i32>() else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid API key ID");
    };
    let update = ApiKeyUpdate {
        name: req.name,
        device_id: req.device_id,
        expires_at: req.expires_at,
        is_active: req.is_active,
    };
    match state.storage.update_api_key(key_id, update).await {
        Ok(Some(api_key)) => Json(api_key).into_response(),
        Ok(None) => message_response(StatusCode::NOT_FOUND, "API key not found"),
        Err(e) => internal_error(&trace_id, "Failed to update API key", e),
    }
}

/// Deletes an API key.
#[utoipa::path(
    delete,
    path = "/api/keys/{id}",
    tag = "API Keys",
    params(("id" = i32, Path, description = "API key id")),
    responses(
        (status = 200, description = "Deleted", body = crate::api::ErrorBody),
        (status = 400, description = "Non-numeric id", body = crate::api::ErrorBody),
        (status = 404, description = "Unknown key", body = crate::api::ErrorBody)
    )
)]
async fn delete_api_key(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(key_id) = id.parse::<i32>() else {
        return message_response(StatusCode::BAD_REQUEST, "Invalid API key ID");
    };
    match state.storage.delete_api_key(key_id).await {
        Ok(true) => message_response(StatusCode::OK, "API key deleted"),
        Ok(false) => message_response(StatusCode::NOT_FOUND, "API key not found"),
        Err(e) => internal_error(&trace_id, "Failed to delete API key", e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_api_keys, create_api_key))
        .routes(routes!(update_api_key, delete_api_key))
}
