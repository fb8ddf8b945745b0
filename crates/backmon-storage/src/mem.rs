//! In-memory [`Storage`] backend.
//!
//! One mutex guards the whole state, which also gives `process_report`
//! its atomicity: every trait method takes the lock once and releases it
//! before returning. Id counters live inside the locked state, one per
//! entity, issuing ids from 1 upward and never reusing them.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use backmon_common::report::ReportSubmission;
use backmon_common::types::{Alert, ApiKey, BackupReport, Device, User};

use crate::error::Result;
use crate::{
    alert_for_report, ApiKeyUpdate, DashboardStats, IngestOutcome, NewAlert, NewApiKey,
    NewBackupReport, NewDevice, NewUser, ReportFilters, Storage,
};

#[derive(Default)]
struct MemInner {
    users: BTreeMap<i32, User>,
    api_keys: BTreeMap<i32, ApiKey>,
    devices: BTreeMap<i32, Device>,
    reports: BTreeMap<i32, BackupReport>,
    alerts: BTreeMap<i32, Alert>,
    last_user_id: i32,
    last_api_key_id: i32,
    last_device_id: i32,
    last_report_id: i32,
    last_alert_id: i32,
}

/// Mutex-guarded map storage, the test backend.
#[derive(Default)]
pub struct MemStorage {
    inner: Mutex<MemInner>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// Event time descending, equal times break toward the higher id.
fn newest_first(a: &BackupReport, b: &BackupReport) -> std::cmp::Ordering {
    b.time.cmp(&a.time).then(b.id.cmp(&a.id))
}

fn insert_device(inner: &mut MemInner, new: &NewDevice) -> Device {
    let id = next_id(&mut inner.last_device_id);
    let device = Device {
        id,
        hostname: new.hostname.clone(),
        ip: new.ip.clone(),
        device_type: new.device_type.clone(),
        created_at: Utc::now(),
    };
    inner.devices.insert(id, device.clone());
    device
}

fn insert_report(inner: &mut MemInner, new: &NewBackupReport) -> BackupReport {
    let id = next_id(&mut inner.last_report_id);
    let report = BackupReport {
        id,
        device_id: new.device_id,
        status: new.status,
        time: new.time,
        size: new.size.clone(),
        size_bytes: new.size_bytes,
        duration: new.duration,
        job_name: new.job_name.clone(),
        error_message: new.error_message.clone(),
        file_count: new.file_count,
        source_path: new.source_path.clone(),
        destination_path: new.destination_path.clone(),
        compression_ratio: new.compression_ratio,
        changed_files: new.changed_files,
        deleted_files: new.deleted_files,
        added_files: new.added_files,
        modified_files: new.modified_files,
        examining_files: new.examining_files,
        was_verified: new.was_verified,
        verification_result: new.verification_result.clone(),
        verification_errors: new.verification_errors.clone(),
        last_verification: new.last_verification,
        metadata: new.metadata.clone(),
    };
    inner.reports.insert(id, report.clone());
    report
}

fn insert_alert(inner: &mut MemInner, new: &NewAlert) -> Alert {
    let id = next_id(&mut inner.last_alert_id);
    let alert = Alert {
        id,
        device_id: new.device_id,
        title: new.title.clone(),
        message: new.message.clone(),
        severity: new.severity,
        time: new.time,
        is_read: false,
    };
    inner.alerts.insert(id, alert.clone());
    alert
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_user(&self, id: i32) -> Result<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut inner = self.lock();
        let id = next_id(&mut inner.last_user_id);
        let user = User {
            id,
            username: new.username,
            password: new.password,
            role: new.role,
        };
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_api_keys(&self) -> Result<Vec<ApiKey>> {
        Ok(self.lock().api_keys.values().cloned().collect())
    }

    async fn get_api_key(&self, id: i32) -> Result<Option<ApiKey>> {
        Ok(self.lock().api_keys.get(&id).cloned())
    }

    async fn get_api_key_by_value(&self, key: &str) -> Result<Option<ApiKey>> {
        Ok(self
            .lock()
            .api_keys
            .values()
            .find(|k| k.key == key)
            .cloned())
    }

    async fn create_api_key(&self, new: NewApiKey) -> Result<ApiKey> {
        let mut inner = self.lock();
        let id = next_id(&mut inner.last_api_key_id);
        let api_key = ApiKey {
            id,
            key: new.key,
            name: new.name,
            device_id: new.device_id,
            created_at: Utc::now(),
            expires_at: new.expires_at,
            last_used: None,
            is_active: new.is_active,
        };
        inner.api_keys.insert(id, api_key.clone());
        Ok(api_key)
    }

    async fn update_api_key(&self, id: i32, update: ApiKeyUpdate) -> Result<Option<ApiKey>> {
        let mut inner = self.lock();
        let Some(api_key) = inner.api_keys.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            api_key.name = name;
        }
        if let Some(device_id) = update.device_id {
            api_key.device_id = Some(device_id);
        }
        if let Some(expires_at) = update.expires_at {
            api_key.expires_at = Some(expires_at);
        }
        if let Some(is_active) = update.is_active {
            api_key.is_active = is_active;
        }
        Ok(Some(api_key.clone()))
    }

    async fn delete_api_key(&self, id: i32) -> Result<bool> {
        Ok(self.lock().api_keys.remove(&id).is_some())
    }

    async fn validate_api_key(&self, key: &str) -> Result<bool> {
        let mut inner = self.lock();
        let now = Utc::now();
        let Some(api_key) = inner.api_keys.values_mut().find(|k| k.key == key) else {
            tracing::debug!("api key rejected: unknown key");
            return Ok(false);
        };
        if !api_key.is_active {
            tracing::debug!(key_id = api_key.id, "api key rejected: inactive");
            return Ok(false);
        }
        if let Some(expires_at) = api_key.expires_at {
            if expires_at < now {
                tracing::debug!(key_id = api_key.id, "api key rejected: expired");
                return Ok(false);
            }
        }
        api_key.last_used = Some(now);
        Ok(true)
    }

    async fn get_devices(&self) -> Result<Vec<Device>> {
        Ok(self.lock().devices.values().cloned().collect())
    }

    async fn get_device(&self, id: i32) -> Result<Option<Device>> {
        Ok(self.lock().devices.get(&id).cloned())
    }

    async fn get_device_by_hostname(&self, hostname: &str) -> Result<Option<Device>> {
        Ok(self
            .lock()
            .devices
            .values()
            .find(|d| d.hostname == hostname)
            .cloned())
    }

    async fn create_device(&self, new: NewDevice) -> Result<Device> {
        Ok(insert_device(&mut self.lock(), &new))
    }

    async fn get_backup_reports(&self, filters: &ReportFilters) -> Result<Vec<BackupReport>> {
        let inner = self.lock();
        let cutoff = filters
            .date_range
            .map(|range| range.cutoff_from(Utc::now()));
        let device_ids: Option<Vec<i32>> = filters.device_type.as_ref().map(|device_type| {
            inner
                .devices
                .values()
                .filter(|d| d.device_type == *device_type)
                .map(|d| d.id)
                .collect()
        });

        let mut reports: Vec<BackupReport> = inner
            .reports
            .values()
            .filter(|r| filters.status.map(|s| r.status == s).unwrap_or(true))
            .filter(|r| cutoff.map(|c| r.time >= c).unwrap_or(true))
            .filter(|r| {
                device_ids
                    .as_ref()
                    .map(|ids| ids.contains(&r.device_id))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        reports.sort_by(newest_first);
        Ok(reports)
    }

    async fn get_latest_backup_report_per_device(&self) -> Result<Vec<BackupReport>> {
        let inner = self.lock();
        let mut latest = Vec::new();
        for device_id in inner.devices.keys() {
            let mut device_reports: Vec<&BackupReport> = inner
                .reports
                .values()
                .filter(|r| r.device_id == *device_id)
                .collect();
            device_reports.sort_by(|a, b| newest_first(a, b));
            if let Some(first) = device_reports.first() {
                latest.push((*first).clone());
            }
        }
        Ok(latest)
    }

    async fn get_backup_reports_by_device(&self, device_id: i32) -> Result<Vec<BackupReport>> {
        let inner = self.lock();
        let mut reports: Vec<BackupReport> = inner
            .reports
            .values()
            .filter(|r| r.device_id == device_id)
            .cloned()
            .collect();
        reports.sort_by(newest_first);
        Ok(reports)
    }

    async fn create_backup_report(&self, new: NewBackupReport) -> Result<BackupReport> {
        Ok(insert_report(&mut self.lock(), &new))
    }

    async fn process_report(&self, submission: ReportSubmission) -> Result<IngestOutcome> {
        // One lock scope for the whole pipeline keeps it atomic.
        let mut inner = self.lock();

        let device = match inner
            .devices
            .values()
            .find(|d| d.hostname == submission.hostname)
            .cloned()
        {
            Some(found) => found,
            None => insert_device(
                &mut inner,
                &NewDevice {
                    hostname: submission.hostname.clone(),
                    ip: submission.ip.clone().unwrap_or_default(),
                    device_type: submission
                        .device_type
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                },
            ),
        };

        let report = insert_report(
            &mut inner,
            &NewBackupReport::from_submission(device.id, &submission),
        );

        let alert = alert_for_report(&device, &submission, Utc::now())
            .map(|new_alert| insert_alert(&mut inner, &new_alert));

        Ok(IngestOutcome {
            report,
            device,
            alert,
        })
    }

    async fn get_alerts(&self) -> Result<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self.lock().alerts.values().cloned().collect();
        alerts.sort_by(|a, b| b.time.cmp(&a.time).then(b.id.cmp(&a.id)));
        Ok(alerts)
    }

    async fn get_recent_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        let mut alerts = self.get_alerts().await?;
        alerts.truncate(limit);
        Ok(alerts)
    }

    async fn create_alert(&self, new: NewAlert) -> Result<Alert> {
        Ok(insert_alert(&mut self.lock(), &new))
    }

    async fn mark_alert_as_read(&self, id: i32) -> Result<Option<Alert>> {
        let mut inner = self.lock();
        let Some(alert) = inner.alerts.get_mut(&id) else {
            return Ok(None);
        };
        alert.is_read = true;
        Ok(Some(alert.clone()))
    }

    async fn get_dashboard_stats(&self) -> Result<DashboardStats> {
        let total_devices = self.lock().devices.len() as u64;
        let latest = self.get_latest_backup_report_per_device().await?;
        Ok(crate::store::report::classify_latest(total_devices, &latest))
    }
}
