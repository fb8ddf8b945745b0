#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use backmon_server::app;
use backmon_server::config::ServerConfig;
use backmon_server::state::AppState;
use backmon_storage::store::DbStorage;
use backmon_storage::Storage;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> TestContext {
    build_test_context_with(ServerConfig::default()).await
}

pub async fn build_test_context_with(config: ServerConfig) -> TestContext {
    let temp_dir = tempfile::tempdir().expect("tempdir should create");
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("backmon.db").display()
    );
    let storage: Arc<dyn Storage> =
        Arc::new(DbStorage::new(&db_url).await.expect("storage should init"));

    let state = AppState {
        storage,
        config: Arc::new(config),
        start_time: Utc::now(),
    };
    let app = app::build_http_app(state.clone());

    TestContext {
        temp_dir,
        state,
        app,
    }
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(json.to_string())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.expect("request should run");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}
