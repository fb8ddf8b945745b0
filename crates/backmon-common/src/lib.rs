//! Shared domain types for the backmon backup-monitoring dashboard.
//!
//! Everything that crosses a crate boundary lives here: the status and
//! severity enums, the date-range buckets used by report filters, the
//! persisted record types, and the untrusted report submission schema
//! with its field-error-collecting validator.

pub mod report;
pub mod types;
