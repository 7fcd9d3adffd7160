//! Transactional entity repositories
//!
//! This module provides the generic repository every entity type is persisted
//! through, and the pieces it is composed from.
//!
//! # Features
//!
//! - **Status guard**: [`Lifecycle`] tables checked by [`is_valid_transition`]
//!   before any status-changing write
//! - **Domain events**: collected from the entity, published in order after
//!   the write committed
//! - **Cache-aside reads**: namespaced keys, evicted on every save and delete
//! - **Error mapping**: [`ErrorMapping`] rewrites [`RepositoryError`] into
//!   caller-facing [`DomainError`]s at the method boundary
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use challenge_store::domain::FocusArea;
//! use challenge_store::repository::EntityRepository;
//! use challenge_store::storage::MemoryStorage;
//!
//! # async fn demo() -> Result<(), challenge_store::repository::DomainError> {
//! let repo = EntityRepository::<FocusArea>::new(Arc::new(MemoryStorage::new()));
//! let mut area = FocusArea::new("fa1", "Fundamentals");
//! repo.save(&mut area).await?;
//! assert!(repo.find_by_code("fa1").await?.is_some());
//! # Ok(())
//! # }
//! ```

mod entity_repository;
mod error;
mod lifecycle;
mod mapping;
mod traits;


pub use entity_repository::{EntityRepository, SeedFailure, SeedReport};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, StatusChange};
pub use lifecycle::{is_valid_transition, Lifecycle, NoStatus};
pub use mapping::{DomainError, DomainErrorKind, ErrorMapping};
pub use traits::{Entity, EntityStore, RepositoryResult, RowMapError, RowMapper, SerdeMapper};
