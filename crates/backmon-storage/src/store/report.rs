use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};

use backmon_common::report::ReportSubmission;
use backmon_common::types::{BackupReport, BackupStatus};

use crate::entities::backup_report::{self, Column, Entity};
use crate::entities::device::{self, Entity as DeviceEntity};
use crate::error::{Result, StorageError};
use crate::store::{alert, device as device_store, DbStorage};
use crate::{alert_for_report, DashboardStats, IngestOutcome, NewBackupReport, NewDevice};

pub(crate) fn to_report(m: backup_report::Model) -> Result<BackupReport> {
    let status = m
        .status
        .parse::<BackupStatus>()
        .map_err(|_| StorageError::InvalidValue {
            column: "status",
            value: m.status.clone(),
        })?;
    let metadata = serde_json::from_str(&m.metadata)?;
    Ok(BackupReport {
        id: m.id,
        device_id: m.device_id,
        status,
        time: m.time.with_timezone(&Utc),
        size: m.size,
        size_bytes: m.size_bytes,
        duration: m.duration,
        job_name: m.job_name,
        error_message: m.error_message,
        file_count: m.file_count,
        source_path: m.source_path,
        destination_path: m.destination_path,
        compression_ratio: m.compression_ratio,
        changed_files: m.changed_files,
        deleted_files: m.deleted_files,
        added_files: m.added_files,
        modified_files: m.modified_files,
        examining_files: m.examining_files,
        was_verified: m.was_verified,
        verification_result: m.verification_result,
        verification_errors: m.verification_errors,
        last_verification: m.last_verification.map(|t| t.with_timezone(&Utc)),
        metadata,
    })
}

pub(crate) async fn insert<C: ConnectionTrait>(
    conn: &C,
    new: &NewBackupReport,
) -> Result<BackupReport> {
    let metadata = serde_json::to_string(&new.metadata)?;
    let am = backup_report::ActiveModel {
        device_id: Set(new.device_id),
        status: Set(new.status.to_string()),
        time: Set(new.time.fixed_offset()),
        size: Set(new.size.clone()),
        size_bytes: Set(new.size_bytes),
        duration: Set(new.duration),
        job_name: Set(new.job_name.clone()),
        error_message: Set(new.error_message.clone()),
        file_count: Set(new.file_count),
        source_path: Set(new.source_path.clone()),
        destination_path: Set(new.destination_path.clone()),
        compression_ratio: Set(new.compression_ratio),
        changed_files: Set(new.changed_files),
        deleted_files: Set(new.deleted_files),
        added_files: Set(new.added_files),
        modified_files: Set(new.modified_files),
        examining_files: Set(new.examining_files),
        was_verified: Set(new.was_verified),
        verification_result: Set(new.verification_result.clone()),
        verification_errors: Set(new.verification_errors.clone()),
        last_verification: Set(new.last_verification.map(|t| t.fixed_offset())),
        metadata: Set(metadata),
        ..Default::default()
    };
    to_report(am.insert(conn).await?)
}

impl DbStorage {
    pub(crate) async fn get_backup_reports_impl(
        &self,
        filters: &crate::ReportFilters,
    ) -> Result<Vec<BackupReport>> {
        let mut q = Entity::find();

        if let Some(status) = filters.status {
            q = q.filter(Column::Status.eq(status.to_string()));
        }
        if let Some(range) = filters.date_range {
            let cutoff = range.cutoff_from(Utc::now());
            q = q.filter(Column::Time.gte(cutoff.fixed_offset()));
        }
        if let Some(ref device_type) = filters.device_type {
            let device_ids: Vec<i32> = DeviceEntity::find()
                .filter(device::Column::DeviceType.eq(device_type.as_str()))
                .all(self.db())
                .await?
                .into_iter()
                .map(|d| d.id)
                .collect();
            if device_ids.is_empty() {
                return Ok(Vec::new());
            }
            q = q.filter(Column::DeviceId.is_in(device_ids));
        }

        let rows = q
            .order_by_desc(Column::Time)
            .order_by_desc(Column::Id)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_report).collect()
    }

    pub(crate) async fn get_latest_backup_report_per_device_impl(
        &self,
    ) -> Result<Vec<BackupReport>> {
        let device_ids: Vec<i32> = DeviceEntity::find()
            .order_by_asc(device::Column::Id)
            .all(self.db())
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();

        let mut latest = Vec::new();
        for device_id in device_ids {
            let row = Entity::find()
                .filter(Column::DeviceId.eq(device_id))
                .order_by_desc(Column::Time)
                .order_by_desc(Column::Id)
                .one(self.db())
                .await?;
            if let Some(m) = row {
                latest.push(to_report(m)?);
            }
        }
        Ok(latest)
    }

    pub(crate) async fn get_backup_reports_by_device_impl(
        &self,
        device_id: i32,
    ) -> Result<Vec<BackupReport>> {
        let rows = Entity::find()
            .filter(Column::DeviceId.eq(device_id))
            .order_by_desc(Column::Time)
            .order_by_desc(Column::Id)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_report).collect()
    }

    /// Runs the whole pipeline inside one transaction so a concurrent
    /// reader never observes a report without its device, or a
    /// warning/failed report without its alert.
    pub(crate) async fn process_report_impl(
        &self,
        submission: ReportSubmission,
    ) -> Result<IngestOutcome> {
        let outcome = self
            .db
            .transaction::<_, IngestOutcome, StorageError>(move |txn| {
                Box::pin(async move {
                    let device = match device_store::find_by_hostname(txn, &submission.hostname)
                        .await?
                    {
                        Some(found) => found,
                        None => {
                            let new_device = NewDevice {
                                hostname: submission.hostname.clone(),
                                ip: submission.ip.clone().unwrap_or_default(),
                                device_type: submission
                                    .device_type
                                    .clone()
                                    .unwrap_or_else(|| "unknown".to_string()),
                            };
                            let created = device_store::insert(txn, &new_device).await?;
                            tracing::info!(
                                hostname = %created.hostname,
                                device_id = created.id,
                                "registered new device"
                            );
                            created
                        }
                    };

                    let report =
                        insert(txn, &NewBackupReport::from_submission(device.id, &submission))
                            .await?;

                    let alert = match alert_for_report(&device, &submission, Utc::now()) {
                        Some(new_alert) => Some(alert::insert(txn, &new_alert).await?),
                        None => None,
                    };

                    Ok(IngestOutcome {
                        report,
                        device,
                        alert,
                    })
                })
            })
            .await?;
        Ok(outcome)
    }

    pub(crate) async fn get_dashboard_stats_impl(&self) -> Result<DashboardStats> {
        let total_devices = DeviceEntity::find().count(self.db()).await?;
        let latest = self.get_latest_backup_report_per_device_impl().await?;
        Ok(classify_latest(total_devices, &latest))
    }
}

/// Shared between backends: classify the latest-report-per-device set.
pub(crate) fn classify_latest(total_devices: u64, latest: &[BackupReport]) -> DashboardStats {
    let count = |status: BackupStatus| latest.iter().filter(|r| r.status == status).count() as u64;
    DashboardStats {
        total_devices,
        healthy_backups: count(BackupStatus::Success),
        warning_backups: count(BackupStatus::Warning),
        failed_backups: count(BackupStatus::Failed),
    }
}
