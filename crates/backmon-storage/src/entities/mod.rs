pub mod alert;
pub mod api_key;
pub mod backup_report;
pub mod device;
pub mod user;
