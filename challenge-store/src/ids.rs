//! Entity identifiers
//!
//! New entities receive a [TypeID](https://github.com/jetpack-io/typeid) built
//! from a UUIDv7, so ids sort by creation time and carry the entity prefix:
//!
//! ```rust
//! use challenge_store::ids::EntityId;
//!
//! let id = EntityId::generate("focus_area");
//! assert!(id.as_str().starts_with("focus_area_"));
//! ```
//!
//! Ids read back from storage are treated as opaque strings. Rows written by
//! older tooling may carry plain UUIDs, and those must still round-trip.

use mti::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, immutable entity identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generate a new time-sortable id with the given TypeID prefix
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(prefix.create_type_id::<V7>().to_string())
    }

    /// Wrap an id loaded from storage or supplied by a caller
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

impl From<String> for EntityId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}
