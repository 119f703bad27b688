/// Errors from the relational stores. Lookups that can legitimately come
/// up empty (rule queries, the resolve-time row update) report that
/// through their return value rather than an error variant.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON serialization failure (tags / metadata columns).
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
