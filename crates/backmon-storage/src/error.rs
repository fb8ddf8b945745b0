/// Errors surfaced by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found. Query-layer lookups return
    /// `Ok(None)` instead; this variant covers internal invariant
    /// violations such as a report referencing a vanished device.
    #[error("storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: i32 },

    /// An underlying database error.
    #[error("storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON serialization or deserialization failure (metadata columns).
    #[error("storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A column held a value outside its domain (e.g. an unknown status
    /// string written by something other than this service).
    #[error("storage: invalid value in column '{column}': {value}")]
    InvalidValue { column: &'static str, value: String },
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl From<sea_orm::TransactionError<StorageError>> for StorageError {
    fn from(err: sea_orm::TransactionError<StorageError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(e) => StorageError::Database(e),
            sea_orm::TransactionError::Transaction(e) => e,
        }
    }
}
