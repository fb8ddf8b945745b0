use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use backmon_common::report::ReportSubmission;
use backmon_common::types::{BackupStatus, DateRange, Severity};

use crate::mem::MemStorage;
use crate::store::DbStorage;
use crate::{ApiKeyUpdate, NewApiKey, NewDevice, ReportFilters, Storage};

async fn db_store() -> (TempDir, DbStorage) {
    let dir = TempDir::new().unwrap();
    let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("backmon.db").display());
    let store = DbStorage::new(&db_url).await.unwrap();
    (dir, store)
}

fn submission(hostname: &str, status: BackupStatus, time: DateTime<Utc>) -> ReportSubmission {
    ReportSubmission {
        hostname: hostname.to_string(),
        status,
        time,
        size: None,
        size_bytes: None,
        duration: None,
        job_name: None,
        error_message: None,
        file_count: None,
        source_path: None,
        destination_path: None,
        compression_ratio: None,
        changed_files: None,
        deleted_files: None,
        added_files: None,
        modified_files: None,
        examining_files: None,
        was_verified: None,
        verification_result: None,
        verification_errors: None,
        last_verification: None,
        metadata: None,
        ip: None,
        device_type: None,
        api_key: None,
    }
}

async fn check_ingest_creates_device_and_report(store: &dyn Storage) {
    let now = Utc::now();
    let outcome = store
        .process_report(submission("PROD-DB-01", BackupStatus::Success, now))
        .await
        .unwrap();

    assert_eq!(outcome.device.hostname, "PROD-DB-01");
    assert_eq!(outcome.device.device_type, "unknown");
    assert_eq!(outcome.device.ip, "");
    assert_eq!(outcome.report.device_id, outcome.device.id);
    assert!(outcome.alert.is_none());

    // Unset optional fields arrive defaulted, never as null placeholders.
    assert_eq!(outcome.report.size, "");
    assert_eq!(outcome.report.size_bytes, 0);
    assert_eq!(outcome.report.duration, 0);
    assert!(outcome.report.metadata.as_object().unwrap().is_empty());

    assert_eq!(store.get_devices().await.unwrap().len(), 1);
    assert_eq!(
        store
            .get_backup_reports(&ReportFilters::default())
            .await
            .unwrap()
            .len(),
        1
    );
}

async fn check_ingest_reuses_device_for_same_hostname(store: &dyn Storage) {
    let now = Utc::now();
    let first = store
        .process_report(submission("APP-WEB-02", BackupStatus::Success, now))
        .await
        .unwrap();
    let second = store
        .process_report(submission(
            "APP-WEB-02",
            BackupStatus::Success,
            now + Duration::hours(1),
        ))
        .await
        .unwrap();

    assert_eq!(first.device.id, second.device.id);
    assert_eq!(store.get_devices().await.unwrap().len(), 1);

    let reports = store
        .get_backup_reports_by_device(first.device.id)
        .await
        .unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.device_id == first.device.id));
}

async fn check_alert_generation(store: &dyn Storage) {
    let now = Utc::now();

    let mut failed = submission("host-fail", BackupStatus::Failed, now);
    failed.error_message = Some("disk full".to_string());
    let outcome = store.process_report(failed).await.unwrap();
    let alert = outcome.alert.expect("failed report must raise an alert");
    assert_eq!(alert.severity, Severity::Error);
    assert_eq!(alert.title, "Backup failed for host-fail");
    assert_eq!(alert.message, "disk full");
    assert_eq!(alert.device_id, Some(outcome.device.id));
    assert!(!alert.is_read);

    let outcome = store
        .process_report(submission("host-warn", BackupStatus::Warning, now))
        .await
        .unwrap();
    let alert = outcome.alert.expect("warning report must raise an alert");
    assert_eq!(alert.severity, Severity::Warning);
    assert_eq!(alert.message, "Backup completed with warning status.");

    let outcome = store
        .process_report(submission("host-ok", BackupStatus::Success, now))
        .await
        .unwrap();
    assert!(outcome.alert.is_none());

    assert_eq!(store.get_alerts().await.unwrap().len(), 2);
}

async fn check_latest_report_per_device(store: &dyn Storage) {
    let base = Utc::now() - Duration::hours(10);
    for (offset, status) in [
        (0, BackupStatus::Failed),
        (1, BackupStatus::Warning),
        (2, BackupStatus::Success),
    ] {
        store
            .process_report(submission(
                "host-a",
                status,
                base + Duration::hours(offset),
            ))
            .await
            .unwrap();
    }
    // A second device and one report-less device.
    store
        .process_report(submission("host-b", BackupStatus::Warning, base))
        .await
        .unwrap();
    store
        .create_device(NewDevice {
            hostname: "host-idle".to_string(),
            ip: String::new(),
            device_type: "server".to_string(),
        })
        .await
        .unwrap();

    let latest = store.get_latest_backup_report_per_device().await.unwrap();
    assert_eq!(latest.len(), 2, "report-less devices are excluded");

    let device_a = store.get_device_by_hostname("host-a").await.unwrap().unwrap();
    let latest_a = latest
        .iter()
        .find(|r| r.device_id == device_a.id)
        .expect("host-a must be present");
    assert_eq!(latest_a.status, BackupStatus::Success);
    assert_eq!(latest_a.time, base + Duration::hours(2));
}

async fn check_dashboard_stats(store: &dyn Storage) {
    let now = Utc::now();
    // Device A: older failure superseded by a success.
    store
        .process_report(submission(
            "stat-a",
            BackupStatus::Failed,
            now - Duration::hours(2),
        ))
        .await
        .unwrap();
    store
        .process_report(submission("stat-a", BackupStatus::Success, now))
        .await
        .unwrap();
    // Device B: latest is a warning.
    store
        .process_report(submission("stat-b", BackupStatus::Warning, now))
        .await
        .unwrap();
    // Device C: no reports at all.
    store
        .create_device(NewDevice {
            hostname: "stat-c".to_string(),
            ip: String::new(),
            device_type: "workstation".to_string(),
        })
        .await
        .unwrap();

    let stats = store.get_dashboard_stats().await.unwrap();
    assert_eq!(stats.total_devices, 3);
    assert_eq!(stats.healthy_backups, 1);
    assert_eq!(stats.warning_backups, 1);
    assert_eq!(stats.failed_backups, 0);
}

async fn check_mark_alert_as_read(store: &dyn Storage) {
    assert!(store.mark_alert_as_read(9999).await.unwrap().is_none());

    let outcome = store
        .process_report(submission("host-alerting", BackupStatus::Failed, Utc::now()))
        .await
        .unwrap();
    let alert_id = outcome.alert.unwrap().id;

    let first = store.mark_alert_as_read(alert_id).await.unwrap().unwrap();
    assert!(first.is_read);
    let second = store.mark_alert_as_read(alert_id).await.unwrap().unwrap();
    assert!(second.is_read, "second mark is a no-op, not an error");
}

async fn check_report_filters(store: &dyn Storage) {
    let now = Utc::now();
    let mut old = submission("filter-a", BackupStatus::Success, now - Duration::hours(30));
    old.device_type = Some("server".to_string());
    store.process_report(old).await.unwrap();

    let mut fresh = submission("filter-a", BackupStatus::Failed, now - Duration::hours(1));
    fresh.device_type = Some("server".to_string());
    store.process_report(fresh).await.unwrap();

    store
        .process_report(submission(
            "filter-b",
            BackupStatus::Failed,
            now - Duration::hours(1),
        ))
        .await
        .unwrap();

    // Date range: the 30h-old report falls outside 24h.
    let recent = store
        .get_backup_reports(&ReportFilters {
            date_range: Some(DateRange::Last24h),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|r| r.time >= now - Duration::hours(24)));

    // Status alone.
    let failed = store
        .get_backup_reports(&ReportFilters {
            status: Some(BackupStatus::Failed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(failed.len(), 2);

    // All three dimensions AND together.
    let combined = store
        .get_backup_reports(&ReportFilters {
            status: Some(BackupStatus::Failed),
            date_range: Some(DateRange::Last24h),
            device_type: Some("server".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(combined.len(), 1);
    let device_a = store
        .get_device_by_hostname("filter-a")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(combined[0].device_id, device_a.id);

    // Unknown device type matches nothing.
    let none = store
        .get_backup_reports(&ReportFilters {
            device_type: Some("mainframe".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());

    // Ordering: most recent first, equal times break toward the higher id.
    let all = store
        .get_backup_reports(&ReportFilters::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[0].time >= all[1].time);
    assert_eq!(all[0].time, all[1].time);
    assert!(all[0].id > all[1].id);
}

async fn check_api_key_validation(store: &dyn Storage) {
    assert!(!store.validate_api_key("no-such-key").await.unwrap());

    let valid = store
        .create_api_key(NewApiKey {
            key: "valid-key".to_string(),
            name: "agents".to_string(),
            device_id: None,
            expires_at: None,
            is_active: true,
        })
        .await
        .unwrap();
    assert!(valid.last_used.is_none());

    store
        .create_api_key(NewApiKey {
            key: "expired-key".to_string(),
            name: "old agents".to_string(),
            device_id: None,
            expires_at: Some(Utc::now() - Duration::days(1)),
            is_active: true,
        })
        .await
        .unwrap();
    store
        .create_api_key(NewApiKey {
            key: "disabled-key".to_string(),
            name: "revoked".to_string(),
            device_id: None,
            expires_at: None,
            is_active: false,
        })
        .await
        .unwrap();

    assert!(store.validate_api_key("valid-key").await.unwrap());
    assert!(!store.validate_api_key("expired-key").await.unwrap());
    assert!(!store.validate_api_key("disabled-key").await.unwrap());

    let touched = store.get_api_key(valid.id).await.unwrap().unwrap();
    assert!(touched.last_used.is_some(), "validation touches last_used");

    // Deactivating through update closes the door.
    store
        .update_api_key(
            valid.id,
            ApiKeyUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!store.validate_api_key("valid-key").await.unwrap());

    assert!(store.delete_api_key(valid.id).await.unwrap());
    assert!(!store.delete_api_key(valid.id).await.unwrap());
}

macro_rules! backend_tests {
    ($($name:ident => $check:ident),+ $(,)?) => {
        mod mem_backend {
            use super::*;

            $(
                #[tokio::test]
                async fn $name() {
                    let store = MemStorage::new();
                    $check(&store).await;
                }
            )+
        }

        mod db_backend {
            use super::*;

            $(
                #[tokio::test]
                async fn $name() {
                    let (_dir, store) = db_store().await;
                    $check(&store).await;
                }
            )+
        }
    };
}

backend_tests! {
    ingest_creates_device_and_report => check_ingest_creates_device_and_report,
    ingest_reuses_device_for_same_hostname => check_ingest_reuses_device_for_same_hostname,
    alert_generation => check_alert_generation,
    latest_report_per_device => check_latest_report_per_device,
    dashboard_stats => check_dashboard_stats,
    mark_alert_as_read => check_mark_alert_as_read,
    report_filters => check_report_filters,
    api_key_validation => check_api_key_validation,
}
