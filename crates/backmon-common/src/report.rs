//! Untrusted report submission schema.
//!
//! Agents POST arbitrary JSON; [`ReportSubmission::parse`] either produces
//! a fully-typed submission or a [`ValidationErrors`] list naming every
//! offending field. Validation never partially applies: a payload with two
//! bad fields reports both and creates nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::types::BackupStatus;

/// A single rejected field with a human-readable reason.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Non-empty collection of field errors for one rejected payload.
#[derive(Debug, Clone)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl std::error::Error for ValidationErrors {}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid report: ")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

/// A validated backup report submission.
///
/// Required fields are concrete; everything optional stays `Option` here
/// and receives its documented default (zero / empty string / empty
/// object) at ingestion time, so storage and aggregation never see null
/// placeholders.
#[derive(Debug, Clone)]
pub struct ReportSubmission {
    pub hostname: String,
    pub status: BackupStatus,
    pub time: DateTime<Utc>,
    pub size: Option<String>,
    pub size_bytes: Option<i64>,
    pub duration: Option<i64>,
    pub job_name: Option<String>,
    pub error_message: Option<String>,
    pub file_count: Option<i64>,
    pub source_path: Option<String>,
    pub destination_path: Option<String>,
    pub compression_ratio: Option<i64>,
    pub changed_files: Option<i64>,
    pub deleted_files: Option<i64>,
    pub added_files: Option<i64>,
    pub modified_files: Option<i64>,
    pub examining_files: Option<i64>,
    pub was_verified: Option<bool>,
    pub verification_result: Option<BackupStatus>,
    pub verification_errors: Option<String>,
    pub last_verification: Option<DateTime<Utc>>,
    pub metadata: Option<Map<String, Value>>,
    /// Submission-only: used for device creation, not persisted on the report.
    pub ip: Option<String>,
    /// Submission-only: used for device creation, not persisted on the report.
    pub device_type: Option<String>,
    /// Submission-only: checked against the API key store when enforcement
    /// is enabled, never persisted or logged.
    pub api_key: Option<String>,
}

impl ReportSubmission {
    /// Validates an untrusted JSON payload.
    ///
    /// Unknown extra fields are ignored. Numeric fields accept JSON
    /// numbers or numeric strings; anything else is a field error rather
    /// than a silent zero.
    pub fn parse(value: &Value) -> Result<Self, ValidationErrors> {
        let Some(obj) = value.as_object() else {
            return Err(ValidationErrors(vec![FieldError {
                field: "body".to_string(),
                message: "expected a JSON object".to_string(),
            }]));
        };

        let mut errors = Vec::new();

        let hostname = match opt_string(obj, "hostname", &mut errors) {
            Some(h) => {
                let trimmed = h.trim().to_string();
                if trimmed.is_empty() {
                    push_error(&mut errors, "hostname", "must be a non-empty string");
                }
                trimmed
            }
            None => {
                push_error(&mut errors, "hostname", "is required");
                String::new()
            }
        };

        let status = match opt_string(obj, "status", &mut errors) {
            Some(s) => match s.parse::<BackupStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    push_error(
                        &mut errors,
                        "status",
                        "must be one of: success, warning, failed",
                    );
                    None
                }
            },
            None => {
                push_error(&mut errors, "status", "is required");
                None
            }
        };

        let time = match obj.get("time") {
            Some(v) if !v.is_null() => parse_datetime(v, "time", &mut errors),
            _ => {
                push_error(&mut errors, "time", "is required");
                None
            }
        };

        let verification_result = match opt_string(obj, "verificationResult", &mut errors) {
            Some(s) => match s.parse::<BackupStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    push_error(
                        &mut errors,
                        "verificationResult",
                        "must be one of: success, warning, failed",
                    );
                    None
                }
            },
            None => None,
        };

        let last_verification = match obj.get("lastVerification") {
            Some(v) if !v.is_null() => parse_datetime(v, "lastVerification", &mut errors),
            _ => None,
        };

        let submission = ReportSubmission {
            hostname,
            status: status.unwrap_or(BackupStatus::Failed),
            time: time.unwrap_or_else(Utc::now),
            size: opt_string(obj, "size", &mut errors),
            size_bytes: opt_i64(obj, "sizeBytes", &mut errors),
            duration: opt_i64(obj, "duration", &mut errors),
            job_name: opt_string(obj, "jobName", &mut errors),
            error_message: opt_string(obj, "errorMessage", &mut errors),
            file_count: opt_i64(obj, "fileCount", &mut errors),
            source_path: opt_string(obj, "sourcePath", &mut errors),
            destination_path: opt_string(obj, "destinationPath", &mut errors),
            compression_ratio: opt_i64(obj, "compressionRatio", &mut errors),
            changed_files: opt_i64(obj, "changedFiles", &mut errors),
            deleted_files: opt_i64(obj, "deletedFiles", &mut errors),
            added_files: opt_i64(obj, "addedFiles", &mut errors),
            modified_files: opt_i64(obj, "modifiedFiles", &mut errors),
            examining_files: opt_i64(obj, "examiningFiles", &mut errors),
            was_verified: opt_bool(obj, "wasVerified", &mut errors),
            verification_result,
            verification_errors: opt_string(obj, "verificationErrors", &mut errors),
            last_verification,
            metadata: opt_object(obj, "metadata", &mut errors),
            ip: opt_string(obj, "ip", &mut errors),
            device_type: opt_string(obj, "deviceType", &mut errors),
            api_key: opt_string(obj, "apiKey", &mut errors),
        };

        if errors.is_empty() {
            Ok(submission)
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn push_error(errors: &mut Vec<FieldError>, field: &str, message: &str) {
    errors.push(FieldError {
        field: field.to_string(),
        message: message.to_string(),
    });
}

fn opt_string(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            push_error(errors, key, "must be a string");
            None
        }
    }
}

fn opt_i64(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<i64> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false) {
                n.as_f64().map(|f| f as i64)
            } else {
                push_error(errors, key, "must be an integer");
                None
            }
        }
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(i) => Some(i),
            Err(_) => {
                push_error(errors, key, "must be an integer");
                None
            }
        },
        Some(_) => {
            push_error(errors, key, "must be an integer");
            None
        }
    }
}

fn opt_bool(obj: &Map<String, Value>, key: &str, errors: &mut Vec<FieldError>) -> Option<bool> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            push_error(errors, key, "must be a boolean");
            None
        }
    }
}

fn opt_object(
    obj: &Map<String, Value>,
    key: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Map<String, Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => {
            push_error(errors, key, "must be an object");
            None
        }
    }
}

fn parse_datetime(
    value: &Value,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => {
                push_error(errors, field, "must be an RFC 3339 timestamp");
                None
            }
        },
        // Epoch milliseconds, the other format deployed agents send.
        Value::Number(n) => match n.as_i64().and_then(DateTime::from_timestamp_millis) {
            Some(dt) => Some(dt),
            None => {
                push_error(errors, field, "must be an epoch-milliseconds timestamp");
                None
            }
        },
        _ => {
            push_error(errors, field, "must be a timestamp");
            None
        }
    }
}
