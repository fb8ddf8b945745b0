use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "backup_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub device_id: i32,
    pub status: String,
    pub time: DateTimeWithTimeZone,
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
    pub last_verification: Option<DateTimeWithTimeZone>,
    /// JSON text; parsed at the row boundary.
    pub metadata: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
