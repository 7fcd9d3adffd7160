//! Entity, mapper and store traits
//!
//! - [`Entity`]: what the repository needs to know about a domain type
//!   (table, cache namespace, business key, status, pending events)
//! - [`RowMapper`]: pure conversion between rows and domain values
//! - [`EntityStore`]: the find/save/delete/seed surface, using RPITIT
//!   (Return Position Impl Trait In Traits) for async methods

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;

use super::error::RepositoryError;
use super::lifecycle::Lifecycle;
use super::mapping::{DomainError, ErrorMapping};
use super::SeedReport;
use crate::events::DomainEvent;
use crate::ids::EntityId;
use crate::storage::{FilterCondition, OrderBy, Row};

/// Result type for operations below the mapping boundary
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// A domain type persisted through [`super::EntityRepository`]
///
/// Attributes beyond id, code and status are opaque to the repository; it only
/// moves them between rows and values through a [`RowMapper`].
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Status enum, or [`super::NoStatus`] for entities without a lifecycle
    type Status: Lifecycle;

    /// Type name used in errors and event names (e.g. `FocusArea`)
    const ENTITY_TYPE: &'static str;

    /// Cache key namespace (e.g. `focusArea`)
    const CACHE_NAMESPACE: &'static str;

    const TABLE: &'static str;

    /// TypeID prefix for new ids
    const ID_PREFIX: &'static str;

    /// Unique business-key column; `None` means entities are keyed by id alone
    const CODE_COLUMN: Option<&'static str> = None;

    /// Predicates whose results are cached under `<ns>:<predicate>:<value>`
    const CACHED_PREDICATES: &'static [&'static str] = &[];

    fn id(&self) -> &EntityId;

    fn code(&self) -> Option<&str> {
        None
    }

    fn status(&self) -> Option<Self::Status> {
        None
    }

    /// Events raised since the last save, oldest first
    fn pending_events(&self) -> &[DomainEvent];

    /// Detach and return the pending events, leaving the list empty
    fn take_events(&mut self) -> Vec<DomainEvent>;

    /// Predicate restricting reads to live records
    fn active_filter() -> FilterCondition;

    /// Ordering applied to collection reads
    fn default_order() -> Vec<OrderBy> {
        Vec::new()
    }

    /// Check invariants before a write
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Build a new entity from a raw seed record
    fn from_seed(record: Value) -> Result<Self, String>;

    /// Payload of the creation event synthesized when an insert raised none
    fn creation_payload(&self) -> Value {
        json!({
            "id": self.id(),
            "code": self.code(),
        })
    }

    fn error_mapping() -> ErrorMapping {
        ErrorMapping::standard(Self::ENTITY_TYPE)
    }

    /// The key a record is looked up by for upserts and deletes
    fn business_key(&self) -> &str {
        match (Self::CODE_COLUMN, self.code()) {
            (Some(_), Some(code)) => code,
            _ => self.id().as_str(),
        }
    }
}

/// Row/value conversion failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Row mapping failed for {entity_type}: {message}")]
pub struct RowMapError {
    pub entity_type: &'static str,
    pub message: String,
}

/// Pure conversion between storage rows and domain values; no I/O
pub trait RowMapper<E>: Send + Sync {
    fn to_domain(&self, row: Row) -> Result<E, RowMapError>;

    fn to_domain_collection(&self, rows: Vec<Row>) -> Result<Vec<E>, RowMapError> {
        rows.into_iter().map(|row| self.to_domain(row)).collect()
    }

    fn to_persistence(&self, entity: &E) -> Result<Row, RowMapError>;
}

/// Mapper that relies on the entity's serde representation
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeMapper;

impl<E: Entity> RowMapper<E> for SerdeMapper {
    fn to_domain(&self, row: Row) -> Result<E, RowMapError> {
        serde_json::from_value(Value::Object(row)).map_err(|e| RowMapError {
            entity_type: E::ENTITY_TYPE,
            message: e.to_string(),
        })
    }

    fn to_persistence(&self, entity: &E) -> Result<Row, RowMapError> {
        match serde_json::to_value(entity) {
            Ok(Value::Object(row)) => Ok(row),
            Ok(other) => Err(RowMapError {
                entity_type: E::ENTITY_TYPE,
                message: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(RowMapError {
                entity_type: E::ENTITY_TYPE,
                message: e.to_string(),
            }),
        }
    }
}

/// Find/save/delete/seed surface shared by every entity repository
///
/// # Example
///
/// ```rust,ignore
/// async fn publish_catalogue<S: EntityStore<FocusArea>>(store: &S) -> Result<usize, DomainError> {
///     Ok(store.find_all().await?.len())
/// }
/// ```
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Returns `Ok(None)` when no active record has this id
    fn find_by_id(&self, id: &str) -> impl Future<Output = Result<Option<E>, DomainError>> + Send;

    /// Returns `Ok(None)` when no active record has this code
    fn find_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<E>, DomainError>> + Send;

    fn find_all(&self) -> impl Future<Output = Result<Vec<E>, DomainError>> + Send;

    /// Insert or update, clearing the entity's pending events
    fn save(&self, entity: &mut E) -> impl Future<Output = Result<E, DomainError>> + Send;

    /// Delete by code (or id for entities without one); `false` if nothing matched
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, DomainError>> + Send;

    fn seed(&self, records: Value) -> impl Future<Output = Result<SeedReport, DomainError>> + Send;
}
