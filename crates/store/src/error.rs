use thiserror::Error;

/// Errors that can occur when interacting with a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with the same idempotency key already exists.
    #[error("Order with idempotency key '{0}' already exists")]
    DuplicateIdempotencyKey(String),

    /// The entity cannot be removed because other records still reference it.
    #[error("{entity} {id} is still referenced by {referenced_by}")]
    InUse {
        entity: &'static str,
        id: String,
        referenced_by: &'static str,
    },

    /// The commit was sent but its result never came back.
    ///
    /// The unit of work may or may not be durable. Retrying is only safe with
    /// an idempotency key.
    #[error("Commit outcome unknown: {0}")]
    CommitOutcomeUnknown(String),

    /// A stored value could not be mapped back into the domain model.
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a data file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
