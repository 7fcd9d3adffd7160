//! Attributes and behaviour shared by the configuration catalogues
//!
//! Focus areas, format types, difficulty levels and challenge types are all
//! keyed by a unique `code`, can be switched on and off, and are listed by
//! `sort_order`. [`ConfigEntity`] supplies their common business methods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::events::DomainEvent;
use crate::ids::EntityId;
use crate::repository::Entity;
use crate::storage::{OrderBy, OrderDirection};

/// Columns every configuration entity carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigAttributes {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl ConfigAttributes {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
            is_active: true,
            sort_order: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Apply an update; returns the names of the fields that changed
    fn apply(&mut self, update: DetailsUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(name) = update.name.filter(|n| *n != self.name) {
            self.name = name;
            changed.push("name");
        }
        if let Some(description) = update.description {
            if self.description.as_deref() != Some(description.as_str()) {
                self.description = Some(description);
                changed.push("description");
            }
        }
        if let Some(sort_order) = update.sort_order.filter(|s| *s != self.sort_order) {
            self.sort_order = sort_order;
            changed.push("sort_order");
        }
        changed
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("code is required".into());
        }
        if self.code.contains(char::is_whitespace) {
            return Err(format!("code '{}' must not contain whitespace", self.code));
        }
        if self.name.trim().is_empty() {
            return Err(format!("name is required for '{}'", self.code));
        }
        Ok(())
    }
}

/// Changes accepted by [`ConfigEntity::update_details`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DetailsUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

/// Business methods shared by configuration entities
pub trait ConfigEntity: Entity {
    fn attributes(&self) -> &ConfigAttributes;

    fn attributes_mut(&mut self) -> &mut ConfigAttributes;

    /// Append an event to the pending list
    fn record_event(&mut self, event: DomainEvent);

    /// Rename, describe or reorder; raises `<Entity>Updated` when anything changed
    fn update_details(&mut self, update: DetailsUpdate) -> bool {
        let changed = self.attributes_mut().apply(update);
        if changed.is_empty() {
            return false;
        }
        self.touch();
        self.raise("Updated", json!({ "changed": changed }));
        true
    }

    /// Raises `<Entity>Activated` unless already active
    fn activate(&mut self) -> bool {
        if self.attributes().is_active {
            return false;
        }
        self.attributes_mut().is_active = true;
        self.touch();
        self.raise("Activated", Value::Null);
        true
    }

    /// Raises `<Entity>Deactivated` unless already inactive
    fn deactivate(&mut self) -> bool {
        if !self.attributes().is_active {
            return false;
        }
        self.attributes_mut().is_active = false;
        self.touch();
        self.raise("Deactivated", Value::Null);
        true
    }

    fn touch(&mut self) {
        self.attributes_mut().updated_at = Some(Utc::now());
    }

    /// Record `<Entity><suffix>` with id and code merged into `extra`
    fn raise(&mut self, suffix: &str, extra: Value) {
        let mut payload = Map::new();
        payload.insert("id".into(), Value::from(self.id().as_str()));
        payload.insert("code".into(), Value::from(self.attributes().code.as_str()));
        if let Value::Object(extra) = extra {
            payload.extend(extra);
        }

        let event = DomainEvent::new(
            Self::ENTITY_TYPE,
            self.id().as_str(),
            format!("{}{}", Self::ENTITY_TYPE, suffix),
            Value::Object(payload),
        );
        self.record_event(event);
    }
}

/// Ordering for configuration listings
pub(crate) fn catalogue_order() -> Vec<OrderBy> {
    vec![
        OrderBy {
            field: "sort_order".into(),
            direction: OrderDirection::Ascending,
        },
        OrderBy {
            field: "code".into(),
            direction: OrderDirection::Ascending,
        },
    ]
}

/// Deserialize a seed record, generating an id when it has none
pub(crate) fn from_record<E: Entity>(mut record: Value) -> Result<E, String> {
    let Value::Object(fields) = &mut record else {
        return Err(format!("{} seed record must be an object", E::ENTITY_TYPE));
    };
    if fields.get("id").map_or(true, Value::is_null) {
        fields.insert(
            "id".into(),
            Value::from(EntityId::generate(E::ID_PREFIX).into_inner()),
        );
    }
    serde_json::from_value(record).map_err(|e| format!("invalid {} record: {}", E::ENTITY_TYPE, e))
}
