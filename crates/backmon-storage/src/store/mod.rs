use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use backmon_common::report::ReportSubmission;
use backmon_common::types::{Alert, ApiKey, BackupReport, Device, User};

use crate::error::Result;
use crate::{
    ApiKeyUpdate, DashboardStats, IngestOutcome, NewAlert, NewApiKey, NewBackupReport, NewDevice,
    NewUser, ReportFilters, Storage,
};

pub mod alert;
pub mod api_key;
pub mod device;
pub mod report;
pub mod user;

/// SeaORM-backed storage, the production backend.
///
/// All methods are `async fn` over a shared [`DatabaseConnection`];
/// schema migrations run automatically on connect.
pub struct DbStorage {
    pub(crate) db: DatabaseConnection,
}

impl DbStorage {
    /// Connects and initializes the database.
    ///
    /// `db_url` is a full connection URL supplied by the server config,
    /// e.g. `sqlite:///data/backmon.db?mode=rwc`. WAL mode is enabled
    /// for SQLite so ingestion writes do not block dashboard reads.
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!(db_url = %db_url, "storage initialized");

        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl Storage for DbStorage {
    async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.get_user_impl(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_api_keys(&self) -> Result<Vec<ApiKey>> {
        self.get_api_keys_impl().await
    }

    async fn get_api_key(&self, id: i32) -> Result<Option<ApiKey>> {
        self.get_api_key_impl(id).await
    }

    async fn get_api_key_by_value(&self, key: &str) -> Result<Option<ApiKey>> {
        self.get_api_key_by_value_impl(key).await
    }

    async fn create_api_key(&self, key: NewApiKey) -> Result<ApiKey> {
        self.create_api_key_impl(key).await
    }

    async fn update_api_key(&self, id: i32, update: ApiKeyUpdate) -> Result<Option<ApiKey>> {
        self.update_api_key_impl(id, update).await
    }

    async fn delete_api_key(&self, id: i32) -> Result<bool> {
        self.delete_api_key_impl(id).await
    }

    async fn validate_api_key(&self, key: &str) -> Result<bool> {
        self.validate_api_key_impl(key).await
    }

    async fn get_devices(&self) -> Result<Vec<Device>> {
        self.get_devices_impl().await
    }

    async fn get_device(&self, id: i32) -> Result<Option<Device>> {
        self.get_device_impl(id).await
    }

    async fn get_device_by_hostname(&self, hostname: &str) -> Result<Option<Device>> {
        device::find_by_hostname(self.db(), hostname).await
    }

    async fn create_device(&self, device: NewDevice) -> Result<Device> {
        device::insert(self.db(), &device).await
    }

    async fn get_backup_reports(&self, filters: &ReportFilters) -> Result<Vec<BackupReport>> {
        self.get_backup_reports_impl(filters).await
    }

    async fn get_latest_backup_report_per_device(&self) -> Result<Vec<BackupReport>> {
        self.get_latest_backup_report_per_device_impl().await
    }

    async fn get_backup_reports_by_device(&self, device_id: i32) -> Result<Vec<BackupReport>> {
        self.get_backup_reports_by_device_impl(device_id).await
    }

    async fn create_backup_report(&self, report: NewBackupReport) -> Result<BackupReport> {
        report::insert(self.db(), &report).await
    }

    async fn process_report(&self, submission: ReportSubmission) -> Result<IngestOutcome> {
        self.process_report_impl(submission).await
    }

    async fn get_alerts(&self) -> Result<Vec<Alert>> {
        self.get_alerts_impl().await
    }

    async fn get_recent_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        self.get_recent_alerts_impl(limit).await
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert> {
        alert::insert(self.db(), &alert).await
    }

    async fn mark_alert_as_read(&self, id: i32) -> Result<Option<Alert>> {
        self.mark_alert_as_read_impl(id).await
    }

    async fn get_dashboard_stats(&self) -> Result<DashboardStats> {
        self.get_dashboard_stats_impl().await
    }
}
