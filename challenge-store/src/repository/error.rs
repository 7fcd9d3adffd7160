//! Repository error types
//!
//! Low-level failures inside a repository are raised as [`RepositoryError`]:
//! an operation, a generic kind and whatever context was at hand (entity type,
//! lookup key, metadata). They are rewritten into domain-specific errors by
//! [`super::ErrorMapping`] before leaving a public repository method.
//!
//! # Example
//!
//! ```rust
//! use challenge_store::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("FocusArea", "fa1");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert_eq!(error.generic_name(), "EntityNotFoundError");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::storage::{StorageError, StorageErrorKind};

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Finding a single entity by id
    FindById,
    /// Finding a single entity by business code
    FindByCode,
    /// Listing all active entities
    FindAll,
    /// A predicate finder (by prerequisite, by status, ...)
    FindBy,
    /// Inserting or updating an entity
    Save,
    Delete,
    /// Bulk insert from raw records
    Seed,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::FindByCode => write!(f, "find_by_code"),
            Self::FindAll => write!(f, "find_all"),
            Self::FindBy => write!(f, "find_by"),
            Self::Save => write!(f, "save"),
            Self::Delete => write!(f, "delete"),
            Self::Seed => write!(f, "seed"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found where absence is exceptional
    NotFound,
    /// Entity already exists (unique key violation)
    AlreadyExists,
    /// Status change rejected by the lifecycle table
    InvalidTransition,
    /// Input rejected before any I/O
    ValidationFailed,
    /// Failed to reach the backend
    ConnectionFailed,
    /// Backend did not answer in time
    Timeout,
    /// Underlying storage error
    DatabaseError,
    /// A row or cached value could not be encoded or decoded
    SerializationError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::InvalidTransition => write!(f, "invalid_transition"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A rejected status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub from: String,
    pub to: String,
}

impl fmt::Display for StatusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g. "Challenge")
    pub entity_type: Option<String>,
    /// The id or code the operation was keyed on
    pub entity_id: Option<String>,
    /// The rejected status change, for `InvalidTransition`
    pub status_change: Option<StatusChange>,
    /// Extra context (storage error code, constraint name, predicate, ...)
    pub metadata: BTreeMap<String, String>,
}

impl RepositoryError {
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            status_change: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, key)
    }

    /// Create an "already exists" error carrying the conflicting code or id
    pub fn already_exists(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Save,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, identifier)
    }

    pub fn validation_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    /// Create an error for a status change the lifecycle table rejects
    pub fn invalid_transition(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        let change = StatusChange {
            from: from.to_string(),
            to: to.to_string(),
        };
        let mut error = Self::new(
            RepositoryOperation::Save,
            RepositoryErrorKind::InvalidTransition,
            format!("Invalid status transition {}", change),
        )
        .with_entity(entity_type, entity_id);
        error.status_change = Some(change);
        error
    }

    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
    }

    /// Wrap a storage failure, keeping its code and constraint as metadata
    pub fn from_storage(operation: RepositoryOperation, err: StorageError) -> Self {
        let kind = match &err.kind {
            StorageErrorKind::UniqueViolation { .. } => RepositoryErrorKind::AlreadyExists,
            StorageErrorKind::ConnectionFailed => RepositoryErrorKind::ConnectionFailed,
            StorageErrorKind::Timeout => RepositoryErrorKind::Timeout,
            StorageErrorKind::QueryFailed => RepositoryErrorKind::DatabaseError,
            StorageErrorKind::Serialization => RepositoryErrorKind::SerializationError,
        };

        let mut error = Self::new(operation, kind, err.message);
        if let Some(code) = err.code {
            error.metadata.insert("storage_code".into(), code);
        }
        if let StorageErrorKind::UniqueViolation { constraint, value } = err.kind {
            error.metadata.insert("constraint".into(), constraint);
            if let Some(value) = value {
                error.metadata.insert("conflicting_value".into(), value);
            }
        }
        error
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(mut self, entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }

    /// Name of the generic error kind callers below the mapping boundary see
    pub fn generic_name(&self) -> &'static str {
        match self.kind {
            RepositoryErrorKind::ValidationFailed => "ValidationError",
            RepositoryErrorKind::NotFound => "EntityNotFoundError",
            RepositoryErrorKind::AlreadyExists => "DuplicateEntityError",
            RepositoryErrorKind::InvalidTransition => "InvalidStatusTransitionError",
            _ => "DatabaseError",
        }
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(RepositoryOperation::FindByCode.to_string(), "find_by_code");
        assert_eq!(RepositoryOperation::Save.to_string(), "save");
        assert_eq!(RepositoryOperation::Seed.to_string(), "seed");
    }

    #[test]
    fn test_invalid_transition_carries_both_statuses() {
        let error =
            RepositoryError::invalid_transition("Challenge", "challenge_1", "completed", "active");
        assert_eq!(error.kind, RepositoryErrorKind::InvalidTransition);
        assert_eq!(
            error.status_change,
            Some(StatusChange {
                from: "completed".into(),
                to: "active".into()
            })
        );
        assert_eq!(error.entity_id.as_deref(), Some("challenge_1"));
        assert!(error.to_string().contains("completed -> active"));
    }

    #[test]
    fn test_unique_violation_maps_to_already_exists() {
        let storage = StorageError::unique_violation("focus_areas_code_key", Some("fa1".into()));
        let error = RepositoryError::from_storage(RepositoryOperation::Save, storage);
        assert_eq!(error.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(error.metadata.get("storage_code").map(String::as_str), Some("23505"));
        assert_eq!(
            error.metadata.get("conflicting_value").map(String::as_str),
            Some("fa1")
        );
        assert_eq!(error.generic_name(), "DuplicateEntityError");
    }

    #[test]
    fn test_timeouts_are_retriable_database_errors() {
        let error = RepositoryError::from_storage(
            RepositoryOperation::FindAll,
            StorageError::timeout("statement timeout"),
        );
        assert!(error.is_retriable());
        assert_eq!(error.generic_name(), "DatabaseError");

        let error = RepositoryError::from_storage(
            RepositoryOperation::FindAll,
            StorageError::query_failed("syntax error"),
        );
        assert!(!error.is_retriable());
    }

    #[test]
    fn test_display_with_entity() {
        let error = RepositoryError::not_found("FocusArea", "fa1");
        let display = error.to_string();
        assert!(display.contains("not_found"));
        assert!(display.contains("[FocusArea: fa1]"));
    }

    #[test]
    fn test_display_without_entity() {
        let error = RepositoryError::validation_failed(RepositoryOperation::FindById, "id is required");
        assert!(!error.to_string().contains('['));
    }
}
