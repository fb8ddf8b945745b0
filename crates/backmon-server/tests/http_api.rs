mod common;

use axum::http::StatusCode;
use backmon_server::config::ServerConfig;
use common::{build_test_context, build_test_context_with, request_json};
use serde_json::json;

fn failed_report(hostname: &str) -> serde_json::Value {
    json!({
        "hostname": hostname,
        "status": "failed",
        "time": "2025-06-01T12:00:00Z",
        "errorMessage": "disk full",
        "jobName": "nightly",
        "deviceType": "server"
    })
}

#[tokio::test]
async fn health_reports_version_and_uptime() {
    let ctx = build_test_context().await;
    let (status, body) = request_json(&ctx.app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_secs"].is_i64());
}

#[tokio::test]
async fn ingest_creates_device_report_and_alert() {
    let ctx = build_test_context().await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/backup/report",
        Some(failed_report("PROD-DB-01")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Backup report received successfully");
    assert_eq!(body["device"]["hostname"], "PROD-DB-01");
    assert_eq!(body["device"]["deviceType"], "server");
    assert_eq!(body["report"]["deviceId"], body["device"]["id"]);
    assert_eq!(body["report"]["status"], "failed");
    assert_eq!(body["alert"]["severity"], "error");
    assert_eq!(body["alert"]["title"], "Backup failed for PROD-DB-01");
    assert_eq!(body["alert"]["message"], "disk full");

    let (status, devices) = request_json(&ctx.app, "GET", "/api/devices", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(devices.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn ingest_success_omits_alert_and_reuses_device() {
    let ctx = build_test_context().await;

    let ok_report = json!({
        "hostname": "APP-WEB-02",
        "status": "success",
        "time": "2025-06-01T12:00:00Z",
        "sizeBytes": 60343559987i64,
        "size": "56.2 GB"
    });
    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/backup/report",
        Some(ok_report.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.get("alert").is_none(), "success raises no alert");
    assert_eq!(body["report"]["sizeBytes"], 60343559987i64);
    let device_id = body["device"]["id"].as_i64().unwrap();

    let (_, body) = request_json(&ctx.app, "POST", "/api/backup/report", Some(ok_report)).await;
    assert_eq!(body["device"]["id"].as_i64().unwrap(), device_id);

    let uri = format!("/api/devices/{device_id}/backup-reports");
    let (status, reports) = request_json(&ctx.app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reports.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn ingest_validation_failure_lists_every_field() {
    let ctx = build_test_context().await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/backup/report",
        Some(json!({"status": "unknown", "time": "soon"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid backup report data");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"hostname"));
    assert!(fields.contains(&"status"));
    assert!(fields.contains(&"time"));

    // Nothing was created.
    let (_, devices) = request_json(&ctx.app, "GET", "/api/devices", None).await;
    assert!(devices.as_array().unwrap().is_empty());
    let (_, alerts) = request_json(&ctx.app, "GET", "/api/alerts", None).await;
    assert!(alerts.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn ingest_enforces_api_key_when_configured() {
    let config = ServerConfig {
        require_api_key: true,
        ..Default::default()
    };
    let ctx = build_test_context_with(config).await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/backup/report",
        Some(failed_report("SECURE-01")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or missing API key");

    let (status, created) = request_json(
        &ctx.app,
        "POST",
        "/api/keys",
        Some(json!({"name": "agents"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = created["key"].as_str().unwrap().to_string();

    let mut report = failed_report("SECURE-01");
    report["apiKey"] = json!(key);
    let (status, _) = request_json(&ctx.app, "POST", "/api/backup/report", Some(report)).await;
    assert_eq!(status, StatusCode::CREATED);

    // Validation touched last_used.
    let (_, keys) = request_json(&ctx.app, "GET", "/api/keys", None).await;
    assert!(keys[0]["lastUsed"].is_string());
}

#[tokio::test]
async fn device_lookup_distinguishes_bad_id_from_missing() {
    let ctx = build_test_context().await;

    let (status, body) = request_json(&ctx.app, "GET", "/api/devices/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid device ID");

    let (status, body) = request_json(&ctx.app, "GET", "/api/devices/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Device not found");

    let (status, body) =
        request_json(&ctx.app, "GET", "/api/devices/999/backup-reports", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Device not found");
}

#[tokio::test]
async fn backup_reports_filters_validate_and_apply() {
    let ctx = build_test_context().await;
    for (hostname, status) in [("h-1", "success"), ("h-2", "failed")] {
        let report = json!({
            "hostname": hostname,
            "status": status,
            "time": chrono::Utc::now().to_rfc3339(),
            "deviceType": "server"
        });
        request_json(&ctx.app, "POST", "/api/backup/report", Some(report)).await;
    }

    let (status, body) =
        request_json(&ctx.app, "GET", "/api/backup-reports?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid status filter");

    let (status, body) =
        request_json(&ctx.app, "GET", "/api/backup-reports?dateRange=90d", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid dateRange filter");

    let (status, reports) = request_json(
        &ctx.app,
        "GET",
        "/api/backup-reports?status=failed&dateRange=24h&deviceType=server",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["status"], "failed");

    let (status, reports) = request_json(
        &ctx.app,
        "GET",
        "/api/backup-reports?deviceType=workstation",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reports.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn latest_backups_carry_their_device() {
    let ctx = build_test_context().await;
    for time in ["2025-06-01T10:00:00Z", "2025-06-01T12:00:00Z"] {
        let report = json!({
            "hostname": "h-latest",
            "status": "success",
            "time": time
        });
        request_json(&ctx.app, "POST", "/api/backup/report", Some(report)).await;
    }

    let (status, body) = request_json(&ctx.app, "GET", "/api/latest-backups", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let time = chrono::DateTime::parse_from_rfc3339(entries[0]["time"].as_str().unwrap()).unwrap();
    assert_eq!(time.timestamp(), 1748779200, "the 12:00 report wins");
    assert_eq!(entries[0]["device"]["hostname"], "h-latest");
}

#[tokio::test]
async fn recent_alerts_enrich_and_honor_limit() {
    let ctx = build_test_context().await;
    for hostname in ["al-1", "al-2", "al-3"] {
        request_json(
            &ctx.app,
            "POST",
            "/api/backup/report",
            Some(failed_report(hostname)),
        )
        .await;
    }

    let (status, body) = request_json(&ctx.app, "GET", "/api/recent-alerts?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body.as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0]["device"]["hostname"].is_string());

    let (status, body) = request_json(&ctx.app, "GET", "/api/recent-alerts?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid limit");

    // Default limit applies when the parameter is omitted.
    let (status, body) = request_json(&ctx.app, "GET", "/api/recent-alerts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn mark_alert_read_is_idempotent() {
    let ctx = build_test_context().await;

    let (status, body) = request_json(&ctx.app, "PATCH", "/api/alerts/42/read", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Alert not found");

    let (_, body) = request_json(
        &ctx.app,
        "POST",
        "/api/backup/report",
        Some(failed_report("al-host")),
    )
    .await;
    let alert_id = body["alert"]["id"].as_i64().unwrap();

    let uri = format!("/api/alerts/{alert_id}/read");
    let (status, body) = request_json(&ctx.app, "PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isRead"], true);

    let (status, body) = request_json(&ctx.app, "PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isRead"], true);
}

#[tokio::test]
async fn stats_classify_latest_reports_only() {
    let ctx = build_test_context().await;

    // Device A: failure superseded by success.
    for (status, time) in [("failed", "2025-06-01T08:00:00Z"), ("success", "2025-06-01T12:00:00Z")]
    {
        let report = json!({"hostname": "st-a", "status": status, "time": time});
        request_json(&ctx.app, "POST", "/api/backup/report", Some(report)).await;
    }
    // Device B: latest is a warning.
    let report = json!({"hostname": "st-b", "status": "warning", "time": "2025-06-01T12:00:00Z"});
    request_json(&ctx.app, "POST", "/api/backup/report", Some(report)).await;

    let (status, stats) = request_json(&ctx.app, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({
            "totalDevices": 2,
            "healthyBackups": 1,
            "warningBackups": 1,
            "failedBackups": 0
        })
    );
}

#[tokio::test]
async fn api_key_crud_round_trip() {
    let ctx = build_test_context().await;

    let (status, body) = request_json(
        &ctx.app,
        "POST",
        "/api/keys",
        Some(json!({"name": "  "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "API key name cannot be empty");

    let (status, created) = request_json(
        &ctx.app,
        "POST",
        "/api/keys",
        Some(json!({"name": "agents"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["key"].as_str().unwrap().len(), 64);
    assert_eq!(created["isActive"], true);
    let id = created["id"].as_i64().unwrap();

    let uri = format!("/api/keys/{id}");
    let (status, updated) = request_json(
        &ctx.app,
        "PATCH",
        &uri,
        Some(json!({"isActive": false, "name": "agents (revoked)"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["isActive"], false);
    assert_eq!(updated["name"], "agents (revoked)");

    let (status, _) = request_json(&ctx.app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = request_json(&ctx.app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "API key not found");
}
