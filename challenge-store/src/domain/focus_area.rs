//! Focus areas: the skill domains challenges are grouped under

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::config::{catalogue_order, from_record, ConfigAttributes, ConfigEntity};
use crate::events::DomainEvent;
use crate::ids::EntityId;
use crate::repository::{DomainError, Entity, EntityRepository, NoStatus, RowMapper};
use crate::storage::{FilterCondition, OrderBy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusArea {
    pub id: EntityId,
    #[serde(flatten)]
    pub attributes: ConfigAttributes,
    /// Codes of focus areas to complete first
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub related_areas: Vec<String>,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

fn empty_object() -> Value {
    json!({})
}

impl FocusArea {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(Self::ID_PREFIX),
            attributes: ConfigAttributes::new(code, name),
            prerequisites: Vec::new(),
            related_areas: Vec::new(),
            metadata: empty_object(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_prerequisites(mut self, prerequisites: Vec<String>) -> Self {
        self.prerequisites = prerequisites;
        self
    }

    #[must_use]
    pub fn with_related_areas(mut self, related: Vec<String>) -> Self {
        self.related_areas = related;
        self
    }

    /// Replace the prerequisite list; raises `FocusAreaUpdated` on change
    pub fn set_prerequisites(&mut self, prerequisites: Vec<String>) -> bool {
        if self.prerequisites == prerequisites {
            return false;
        }
        self.prerequisites = prerequisites;
        self.touch();
        let payload = json!({ "changed": ["prerequisites"] });
        self.raise("Updated", payload);
        true
    }
}

impl Entity for FocusArea {
    type Status = NoStatus;
    const ENTITY_TYPE: &'static str = "FocusArea";
    const CACHE_NAMESPACE: &'static str = "focusArea";
    const TABLE: &'static str = "focus_areas";
    const ID_PREFIX: &'static str = "focus_area";
    const CODE_COLUMN: Option<&'static str> = Some("code");
    const CACHED_PREDICATES: &'static [&'static str] = &["prerequisite"];

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn code(&self) -> Option<&str> {
        Some(&self.attributes.code)
    }

    fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn active_filter() -> FilterCondition {
        FilterCondition::eq("is_active", true)
    }

    fn default_order() -> Vec<OrderBy> {
        catalogue_order()
    }

    fn validate(&self) -> Result<(), String> {
        self.attributes.validate()?;
        if self.prerequisites.contains(&self.attributes.code) {
            return Err(format!(
                "focus area '{}' cannot be its own prerequisite",
                self.attributes.code
            ));
        }
        Ok(())
    }

    fn from_seed(record: Value) -> Result<Self, String> {
        from_record(record)
    }
}

impl ConfigEntity for FocusArea {
    fn attributes(&self) -> &ConfigAttributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut ConfigAttributes {
        &mut self.attributes
    }

    fn record_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }
}

pub type FocusAreaRepository = EntityRepository<FocusArea>;

impl<M: RowMapper<FocusArea>> EntityRepository<FocusArea, M> {
    /// Active focus areas that list `code` as a prerequisite
    pub async fn find_by_prerequisite(&self, code: &str) -> Result<Vec<FocusArea>, DomainError> {
        self.find_by(
            "prerequisite",
            code,
            FilterCondition::contains("prerequisites", code),
        )
        .await
    }
}
