use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a backup job as reported by an agent.
///
/// The wire values `success` / `warning` / `failed` are part of the
/// compatibility surface with deployed agents and must not change.
///
/// # Examples
///
/// ```
/// use backmon_common::types::BackupStatus;
///
/// let status: BackupStatus = "failed".parse().unwrap();
/// assert_eq!(status, BackupStatus::Failed);
/// assert_eq!(status.to_string(), "failed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Success,
    Warning,
    Failed,
}

impl std::fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupStatus::Success => write!(f, "success"),
            BackupStatus::Warning => write!(f, "warning"),
            BackupStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for BackupStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(BackupStatus::Success),
            "warning" => Ok(BackupStatus::Warning),
            "failed" => Ok(BackupStatus::Failed),
            _ => Err(format!("unknown backup status: {s}")),
        }
    }
}

/// Alert severity level, ordered from lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Relative date-range bucket for report history filters.
///
/// The cutoff is measured from the moment the query executes, against the
/// report's event `time` rather than its ingestion time.
///
/// # Examples
///
/// ```
/// use backmon_common::types::DateRange;
/// use chrono::{Duration, Utc};
///
/// let range: DateRange = "24h".parse().unwrap();
/// let now = Utc::now();
/// assert_eq!(range.cutoff_from(now), now - Duration::hours(24));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DateRange {
    #[serde(rename = "24h")]
    Last24h,
    #[serde(rename = "3d")]
    Last3d,
    #[serde(rename = "7d")]
    Last7d,
    #[serde(rename = "30d")]
    Last30d,
}

impl DateRange {
    /// Returns the inclusive lower bound of the range relative to `now`.
    pub fn cutoff_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let window = match self {
            DateRange::Last24h => Duration::hours(24),
            DateRange::Last3d => Duration::days(3),
            DateRange::Last7d => Duration::days(7),
            DateRange::Last30d => Duration::days(30),
        };
        now - window
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateRange::Last24h => write!(f, "24h"),
            DateRange::Last3d => write!(f, "3d"),
            DateRange::Last7d => write!(f, "7d"),
            DateRange::Last30d => write!(f, "30d"),
        }
    }
}

impl std::str::FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(DateRange::Last24h),
            "3d" => Ok(DateRange::Last3d),
            "7d" => Ok(DateRange::Last7d),
            "30d" => Ok(DateRange::Last30d),
            _ => Err(format!("unknown date range: {s}")),
        }
    }
}

/// A monitored host, identified by its unique hostname.
///
/// Devices are created implicitly the first time a report arrives for an
/// unknown hostname; there is exactly one device per distinct hostname.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i32,
    pub hostname: String,
    pub ip: String,
    /// Free-form device class; agents conventionally send `server`,
    /// `workstation`, or `unknown`.
    pub device_type: String,
    pub created_at: DateTime<Utc>,
}

/// A single backup-job completion record. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub id: i32,
    pub device_id: i32,
    pub status: BackupStatus,
    /// Event timestamp reported by the agent, not the ingestion time.
    pub time: DateTime<Utc>,
    /// Human-readable size, e.g. `"56.2 GB"`.
    pub size: String,
    pub size_bytes: i64,
    /// Job duration in seconds.
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
    /// Free-form key-value payload forwarded by the agent.
    pub metadata: serde_json::Value,
}

/// A system-generated notification derived from a non-success report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i32,
    pub device_id: Option<i32>,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    /// Ingestion time of the triggering report, not its event time.
    pub time: DateTime<Utc>,
    pub is_read: bool,
}

/// Opaque credential authorizing report submissions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: i32,
    pub key: String,
    pub name: String,
    pub device_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Touched on each successful validation.
    pub last_used: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Dashboard user account. CRUD only; authentication flows live outside
/// this system.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn backup_status_round_trips_through_strings() {
        for s in ["success", "warning", "failed"] {
            let parsed: BackupStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("Success".parse::<BackupStatus>().is_err());
        assert!("unknown".parse::<BackupStatus>().is_err());
    }

    #[test]
    fn severity_ordering_matches_escalation() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn date_range_cutoffs_are_relative_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            DateRange::Last24h.cutoff_from(now),
            now - Duration::hours(24)
        );
        assert_eq!(DateRange::Last30d.cutoff_from(now), now - Duration::days(30));
        assert!("14d".parse::<DateRange>().is_err());
    }
}
