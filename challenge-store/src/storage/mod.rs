//! Storage port
//!
//! The repository layer talks to persistence only through [`StorageBackend`]:
//! select with predicates and ordering, insert, update and delete. Rows are
//! JSON objects keyed by column name; no SQL crosses this boundary.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStorage`]: in-process tables, used by tests and dry runs
//! - `PgStorage` (`database` feature): PostgreSQL via `sqlx`

use async_trait::async_trait;
use std::fmt;

mod filter;
mod memory;

#[cfg(feature = "database")]
mod postgres;

pub use filter::{FilterCondition, FilterOperator, FilterValue, OrderBy, OrderDirection, Query};
pub use memory::{MemoryStorage, StorageCalls, StorageOp};

#[cfg(feature = "database")]
pub use postgres::{create_pool, PgStorage};

/// A persisted row: column name to JSON value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Result type for storage calls
pub type StorageResult<T> = Result<T, StorageError>;

/// Category of storage failure
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// A unique constraint rejected the write
    UniqueViolation {
        /// Constraint or column that was violated
        constraint: String,
        /// The conflicting value, when the backend reports it
        value: Option<String>,
    },
    /// Could not reach the backend
    ConnectionFailed,
    /// The backend or pool did not answer in time
    Timeout,
    /// Query was rejected or failed while executing
    QueryFailed,
    /// A row could not be encoded or decoded
    Serialization,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniqueViolation { .. } => write!(f, "unique_violation"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::QueryFailed => write!(f, "query_failed"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Error returned by a [`StorageBackend`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Storage {kind} error: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
    /// Backend-specific error code (e.g. a SQLSTATE)
    pub code: Option<String>,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn unique_violation(constraint: impl Into<String>, value: Option<String>) -> Self {
        let constraint = constraint.into();
        Self {
            message: format!("duplicate key violates unique constraint \"{}\"", constraint),
            kind: StorageErrorKind::UniqueViolation { constraint, value },
            code: Some("23505".to_string()),
        }
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::QueryFailed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Timeout, message)
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::ConnectionFailed, message)
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self.kind, StorageErrorKind::UniqueViolation { .. })
    }
}

/// Persistence operations consumed by the repositories
///
/// Implementations must apply single-row writes atomically; nothing above
/// this trait coordinates across rows.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Return all rows of `query.table` matching every filter, in `query.order`
    async fn select(&self, query: &Query) -> StorageResult<Vec<Row>>;

    /// Insert one row and return it as stored (with server-side defaults)
    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row>;

    /// Overwrite the given columns of every matching row; returns the updated rows
    async fn update(
        &self,
        table: &str,
        row: Row,
        filters: &[FilterCondition],
    ) -> StorageResult<Vec<Row>>;

    /// Delete matching rows; returns how many were removed
    async fn delete(&self, table: &str, filters: &[FilterCondition]) -> StorageResult<u64>;
}
