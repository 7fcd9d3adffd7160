//! Domain error mapping
//!
//! Each repository owns an [`ErrorMapping`]: a declarative table from generic
//! [`RepositoryErrorKind`]s to the [`DomainErrorKind`] callers branch on, with
//! a default for anything unmapped. It is applied once, at the public method
//! boundary, so storage error shapes never leak to callers.

use std::fmt;

use super::error::{RepositoryError, RepositoryErrorKind, StatusChange};

/// Caller-facing error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainErrorKind {
    /// Input was missing or malformed
    Validation,
    /// The record does not exist
    NotFound,
    /// A record with the same code or id already exists
    Duplicate,
    /// The lifecycle table rejects the status change
    InvalidStatusTransition,
    /// Storage or cache unavailable
    Database,
    /// Anything else
    Processing,
}

impl fmt::Display for DomainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "Validation"),
            Self::NotFound => write!(f, "NotFound"),
            Self::Duplicate => write!(f, "Duplicate"),
            Self::InvalidStatusTransition => write!(f, "InvalidStatusTransition"),
            Self::Database => write!(f, "Database"),
            Self::Processing => write!(f, "Processing"),
        }
    }
}

/// Error returned by public repository methods
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: {source}")]
pub struct DomainError {
    name: String,
    kind: DomainErrorKind,
    #[source]
    source: RepositoryError,
}

impl DomainError {
    /// Error name, e.g. `ChallengeNotFoundError`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DomainErrorKind {
        self.kind
    }

    /// The generic error this was mapped from
    pub fn repository_error(&self) -> &RepositoryError {
        &self.source
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.source.entity_id.as_deref()
    }

    pub fn status_change(&self) -> Option<&StatusChange> {
        self.source.status_change.as_ref()
    }

    pub fn is_retriable(&self) -> bool {
        self.source.is_retriable()
    }

    /// HTTP status a handler would answer with
    pub fn status_hint(&self) -> u16 {
        match self.kind {
            DomainErrorKind::Validation => 400,
            DomainErrorKind::NotFound => 404,
            DomainErrorKind::Duplicate => 409,
            DomainErrorKind::InvalidStatusTransition => 422,
            DomainErrorKind::Database => 503,
            DomainErrorKind::Processing => 500,
        }
    }
}

/// Declarative table from generic to domain error kinds
///
/// ```rust
/// use challenge_store::repository::{
///     DomainErrorKind, ErrorMapping, RepositoryError, RepositoryErrorKind,
/// };
///
/// let mapping = ErrorMapping::standard("FocusArea");
/// let error = mapping.map(RepositoryError::not_found("FocusArea", "fa1"));
/// assert_eq!(error.name(), "FocusAreaNotFoundError");
/// assert_eq!(error.status_hint(), 404);
///
/// let strict = ErrorMapping::new("Challenge", DomainErrorKind::Processing)
///     .rule(RepositoryErrorKind::NotFound, DomainErrorKind::NotFound);
/// let error = strict.map(RepositoryError::validation_failed(
///     challenge_store::repository::RepositoryOperation::Save,
///     "title is required",
/// ));
/// assert_eq!(error.name(), "ChallengeProcessingError");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMapping {
    entity: String,
    rules: Vec<(RepositoryErrorKind, DomainErrorKind)>,
    default: DomainErrorKind,
}

impl ErrorMapping {
    /// An empty table: everything maps to `default`
    pub fn new(entity: impl Into<String>, default: DomainErrorKind) -> Self {
        Self {
            entity: entity.into(),
            rules: Vec::new(),
            default,
        }
    }

    /// The table every repository starts from
    pub fn standard(entity: impl Into<String>) -> Self {
        Self::new(entity, DomainErrorKind::Processing)
            .rule(RepositoryErrorKind::ValidationFailed, DomainErrorKind::Validation)
            .rule(RepositoryErrorKind::NotFound, DomainErrorKind::NotFound)
            .rule(RepositoryErrorKind::AlreadyExists, DomainErrorKind::Duplicate)
            .rule(
                RepositoryErrorKind::InvalidTransition,
                DomainErrorKind::InvalidStatusTransition,
            )
            .rule(RepositoryErrorKind::DatabaseError, DomainErrorKind::Database)
            .rule(RepositoryErrorKind::Timeout, DomainErrorKind::Database)
            .rule(RepositoryErrorKind::ConnectionFailed, DomainErrorKind::Database)
    }

    /// Add or replace the rule for `from`
    #[must_use]
    pub fn rule(mut self, from: RepositoryErrorKind, to: DomainErrorKind) -> Self {
        self.rules.retain(|(kind, _)| *kind != from);
        self.rules.push((from, to));
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn kind_for(&self, kind: RepositoryErrorKind) -> DomainErrorKind {
        self.rules
            .iter()
            .find(|(from, _)| *from == kind)
            .map_or(self.default, |(_, to)| *to)
    }

    pub fn map(&self, error: RepositoryError) -> DomainError {
        let kind = self.kind_for(error.kind);
        DomainError {
            name: format!("{}{}Error", self.entity, kind),
            kind,
            source: error,
        }
    }
}
