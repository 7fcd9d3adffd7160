//! Format types: how a challenge response is given and judged

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{catalogue_order, from_record, ConfigAttributes, ConfigEntity};
use crate::events::DomainEvent;
use crate::ids::EntityId;
use crate::repository::{DomainError, Entity, EntityRepository, NoStatus, RowMapper};
use crate::storage::{FilterCondition, OrderBy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatType {
    pub id: EntityId,
    #[serde(flatten)]
    pub attributes: ConfigAttributes,
    /// Expected response shape (`text`, `code`, `multiple_choice`, ...)
    pub response_format: String,
    #[serde(default)]
    pub evaluation_criteria: Vec<String>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl FormatType {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        response_format: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::generate(Self::ID_PREFIX),
            attributes: ConfigAttributes::new(code, name),
            response_format: response_format.into(),
            evaluation_criteria: Vec::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_evaluation_criteria(mut self, criteria: Vec<String>) -> Self {
        self.evaluation_criteria = criteria;
        self
    }
}

impl Entity for FormatType {
    type Status = NoStatus;
    const ENTITY_TYPE: &'static str = "FormatType";
    const CACHE_NAMESPACE: &'static str = "formatType";
    const TABLE: &'static str = "format_types";
    const ID_PREFIX: &'static str = "format_type";
    const CODE_COLUMN: Option<&'static str> = Some("code");
    const CACHED_PREDICATES: &'static [&'static str] = &["responseFormat"];

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
        if self.response_format.trim().is_empty() {
            return Err(format!(
                "response_format is required for '{}'",
                self.attributes.code
            ));
        }
        Ok(())
    }

    fn from_seed(record: Value) -> Result<Self, String> {
        from_record(record)
    }
}

impl ConfigEntity for FormatType {
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

pub type FormatTypeRepository = EntityRepository<FormatType>;

impl<M: RowMapper<FormatType>> EntityRepository<FormatType, M> {
    pub async fn find_by_response_format(
        &self,
        response_format: &str,
    ) -> Result<Vec<FormatType>, DomainError> {
        self.find_by(
            "responseFormat",
            response_format,
            FilterCondition::eq("response_format", response_format),
        )
        .await
    }
}
