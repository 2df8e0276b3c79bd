//! Storage Layer
//!
//! Persistence boundary for scored anomalies and import batches, with an
//! in-memory repository and a SQLite implementation.

mod model;
mod repository;
mod sqlite;
mod store;

pub use model::{AnomalyId, BatchId, BatchStatus, HumanScores, ImportBatch, StoredAnomaly};
pub use repository::Repository;
pub use sqlite::{SchemaOptions, SqliteStore};
pub use store::{AnomalyStore, StorageResult};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Batch tracking unavailable: {0}")]
    BatchTrackingUnavailable(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
            sqlx::Error::Database(db) => match db.kind() {
                sqlx::error::ErrorKind::Other => StorageError::DatabaseError(err.to_string()),
                _ => StorageError::ConstraintViolation(err.to_string()),
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::SerializationError(err.to_string())
            }
            _ => StorageError::DatabaseError(err.to_string()),
        }
    }
}
