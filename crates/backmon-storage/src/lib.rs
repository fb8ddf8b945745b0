//! Persistence layer for devices, backup reports, alerts, API keys, and
//! users, plus the report-ingestion pipeline and dashboard aggregation.
//!
//! The [`Storage`] trait is the seam between the HTTP layer and the
//! backing store. Two implementations ship: [`store::DbStorage`]
//! (SeaORM over SQLite, schema managed by the `migration` crate) and
//! [`mem::MemStorage`] (locked in-memory maps, used in tests).

pub mod entities;
pub mod error;
pub mod mem;
pub mod store;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use backmon_common::report::ReportSubmission;
use backmon_common::types::{
    Alert, ApiKey, BackupReport, BackupStatus, DateRange, Device, Severity, User,
};

use crate::error::Result;

/// Independently combinable report-history filters (AND semantics).
///
/// An unset dimension places no restriction on the result.
#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub status: Option<BackupStatus>,
    pub date_range: Option<DateRange>,
    pub device_type: Option<String>,
}

/// Aggregated dashboard counters.
///
/// The three backup counters classify the latest-report-per-device set by
/// status; a device with no reports counts toward `total_devices` only,
/// so the counters need not sum to the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_devices: u64,
    pub healthy_backups: u64,
    pub warning_backups: u64,
    pub failed_backups: u64,
}

/// Everything one ingested report produced: the persisted report, its
/// (found or created) device, and the alert when the status warranted one.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub report: BackupReport,
    pub device: Device,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

/// Insert payload for a device.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub hostname: String,
    pub ip: String,
    pub device_type: String,
}

/// Insert payload for a backup report. All optional submission fields
/// have already been defaulted; `last_verification` is the one genuinely
/// optional timestamp.
#[derive(Debug, Clone)]
pub struct NewBackupReport {
    pub device_id: i32,
    pub status: BackupStatus,
    pub time: DateTime<Utc>,
    pub size: String,
    pub size_bytes: i64,
    pub duration: i64,
    pub job_name: String,
    pub error_message: String,
    pub file_count: i64,
    pub source_path: String,
    pub destination_path: String,
    pub compression_ratio: i64,
    pub changed_files: i64,
    pub deleted_files: i64,
    pub added_files: i64,
    pub modified_files: i64,
    pub examining_files: i64,
    pub was_verified: bool,
    pub verification_result: String,
    pub verification_errors: String,
    pub last_verification: Option<DateTime<Utc>>,
    pub metadata: Value,
}

impl NewBackupReport {
    /// Copies every provided submission field onto the owning device,
    /// applying the documented defaults (zero / empty string / empty
    /// object) for anything the agent left out.
    pub fn from_submission(device_id: i32, s: &ReportSubmission) -> Self {
        NewBackupReport {
            device_id,
            status: s.status,
            time: s.time,
            size: s.size.clone().unwrap_or_default(),
            size_bytes: s.size_bytes.unwrap_or(0),
            duration: s.duration.unwrap_or(0),
            job_name: s.job_name.clone().unwrap_or_default(),
            error_message: s.error_message.clone().unwrap_or_default(),
            file_count: s.file_count.unwrap_or(0),
            source_path: s.source_path.clone().unwrap_or_default(),
            destination_path: s.destination_path.clone().unwrap_or_default(),
            compression_ratio: s.compression_ratio.unwrap_or(0),
            changed_files: s.changed_files.unwrap_or(0),
            deleted_files: s.deleted_files.unwrap_or(0),
            added_files: s.added_files.unwrap_or(0),
            modified_files: s.modified_files.unwrap_or(0),
            examining_files: s.examining_files.unwrap_or(0),
            was_verified: s.was_verified.unwrap_or(false),
            verification_result: s
                .verification_result
                .map(|v| v.to_string())
                .unwrap_or_default(),
            verification_errors: s.verification_errors.clone().unwrap_or_default(),
            last_verification: s.last_verification,
            metadata: s
                .metadata
                .clone()
                .map(Value::Object)
                .unwrap_or_else(|| Value::Object(Default::default())),
        }
    }
}

/// Insert payload for an alert.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub device_id: Option<i32>,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub time: DateTime<Utc>,
}

/// Synthesizes the alert a report raises, if any.
///
/// Warning and failed reports each raise exactly one alert; success
/// raises none. `now` is the ingestion time, distinct from the report's
/// own event time.
pub fn alert_for_report(
    device: &Device,
    submission: &ReportSubmission,
    now: DateTime<Utc>,
) -> Option<NewAlert> {
    let severity = match submission.status {
        BackupStatus::Success => return None,
        BackupStatus::Warning => Severity::Warning,
        BackupStatus::Failed => Severity::Error,
    };
    let message = match submission.error_message.as_deref() {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => format!("Backup completed with {} status.", submission.status),
    };
    Some(NewAlert {
        device_id: Some(device.id),
        title: format!("Backup {} for {}", submission.status, device.hostname),
        message,
        severity,
        time: now,
    })
}

/// Insert payload for an API key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub key: String,
    pub name: String,
    pub device_id: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Partial API key update; unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyUpdate {
    pub name: Option<String>,
    pub device_id: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

/// Insert payload for a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: String,
}

/// Abstract persistence interface for the dashboard.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because the same store serves the ingestion handler and the query
/// endpoints concurrently. Missing records surface as `Ok(None)`, never
/// as errors.
#[async_trait]
pub trait Storage: Send + Sync {
    // ---- users ----
    async fn get_user(&self, id: i32) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn create_user(&self, user: NewUser) -> Result<User>;

    // ---- api keys ----
    async fn get_api_keys(&self) -> Result<Vec<ApiKey>>;
    async fn get_api_key(&self, id: i32) -> Result<Option<ApiKey>>;
    async fn get_api_key_by_value(&self, key: &str) -> Result<Option<ApiKey>>;
    async fn create_api_key(&self, key: NewApiKey) -> Result<ApiKey>;
    async fn update_api_key(&self, id: i32, update: ApiKeyUpdate) -> Result<Option<ApiKey>>;
    async fn delete_api_key(&self, id: i32) -> Result<bool>;

    /// Returns whether `key` authorizes a submission right now, touching
    /// `last_used` on success. Unknown, inactive, and expired keys all
    /// fail identically; the distinction is a log concern only.
    async fn validate_api_key(&self, key: &str) -> Result<bool>;

    // ---- devices ----
    async fn get_devices(&self) -> Result<Vec<Device>>;
    async fn get_device(&self, id: i32) -> Result<Option<Device>>;

    /// Exact, case-sensitive hostname lookup (hostnames are trimmed at
    /// validation time). This is the de-duplication key for ingestion.
    async fn get_device_by_hostname(&self, hostname: &str) -> Result<Option<Device>>;
    async fn create_device(&self, device: NewDevice) -> Result<Device>;

    // ---- backup reports ----
    /// Filtered history, ordered by event time descending; equal times
    /// break toward the higher id.
    async fn get_backup_reports(&self, filters: &ReportFilters) -> Result<Vec<BackupReport>>;

    /// Exactly one report (the max-time one) per device that has at
    /// least one; devices without reports are absent from the result.
    async fn get_latest_backup_report_per_device(&self) -> Result<Vec<BackupReport>>;
    async fn get_backup_reports_by_device(&self, device_id: i32) -> Result<Vec<BackupReport>>;
    async fn create_backup_report(&self, report: NewBackupReport) -> Result<BackupReport>;

    /// The ingestion pipeline: find-or-create the device, persist the
    /// report, and raise an alert for warning/failed statuses — as one
    /// atomic unit of work.
    async fn process_report(&self, submission: ReportSubmission) -> Result<IngestOutcome>;

    // ---- alerts ----
    async fn get_alerts(&self) -> Result<Vec<Alert>>;
    async fn get_recent_alerts(&self, limit: usize) -> Result<Vec<Alert>>;
    async fn create_alert(&self, alert: NewAlert) -> Result<Alert>;

    /// Marks an alert read. Idempotent; `Ok(None)` for unknown ids.
    async fn mark_alert_as_read(&self, id: i32) -> Result<Option<Alert>>;

    // ---- statistics ----
    async fn get_dashboard_stats(&self) -> Result<DashboardStats>;
}
