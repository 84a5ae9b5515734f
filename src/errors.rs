use sea_orm::error::DbErr;
use serde::Serialize;

/// Error taxonomy of the core services.
///
/// Every operation is atomic at single-order/single-assignment/single-payment
/// granularity: an error return means no partial state was committed.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    /// Storage-layer failure. Transient contention is retried with backoff in
    /// `db::with_retry` before it surfaces here.
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected input: missing required field for the chosen delivery
    /// disposition, over-refund, non-positive amount or quantity.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Concurrent double-assignment or duplicate write detected at commit
    /// time. Nothing was persisted.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A state transition or capacity claim that would break a documented
    /// invariant, rejected before any write.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Maps a storage error to `Conflict` when it stems from a unique
    /// constraint, otherwise wraps it as `DatabaseError`.
    pub fn from_db_err(err: DbErr, conflict_message: &str) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                ServiceError::Conflict(conflict_message.to_string())
            }
            _ => ServiceError::DatabaseError(err),
        }
    }
}
