//! Challenge types: which focus areas and formats a kind of challenge combines

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::config::{catalogue_order, from_record, ConfigAttributes, ConfigEntity};
use crate::events::DomainEvent;
use crate::ids::EntityId;
use crate::repository::{DomainError, Entity, EntityRepository, NoStatus, RowMapper};
use crate::storage::{FilterCondition, OrderBy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeType {
    pub id: EntityId,
    #[serde(flatten)]
    pub attributes: ConfigAttributes,
    /// Focus area codes this type applies to
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Format type codes this type can be answered in
    #[serde(default)]
    pub format_types: Vec<String>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl ChallengeType {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(Self::ID_PREFIX),
            attributes: ConfigAttributes::new(code, name),
            focus_areas: Vec::new(),
            format_types: Vec::new(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_focus_areas(mut self, focus_areas: Vec<String>) -> Self {
        self.focus_areas = focus_areas;
        self
    }

    #[must_use]
    pub fn with_format_types(mut self, format_types: Vec<String>) -> Self {
        self.format_types = format_types;
        self
    }

    /// Link a focus area; raises `ChallengeTypeUpdated` when newly added
    pub fn add_focus_area(&mut self, code: impl Into<String>) -> bool {
        let code = code.into();
        if self.focus_areas.contains(&code) {
            return false;
        }
        self.focus_areas.push(code.clone());
        self.touch();
        self.raise("Updated", json!({ "changed": ["focus_areas"], "added": code }));
        true
    }

    pub fn supports_format(&self, format_code: &str) -> bool {
        self.format_types.iter().any(|f| f == format_code)
    }
}

impl Entity for ChallengeType {
    type Status = NoStatus;
    const ENTITY_TYPE: &'static str = "ChallengeType";
    const CACHE_NAMESPACE: &'static str = "challengeType";
    const TABLE: &'static str = "challenge_types";
    const ID_PREFIX: &'static str = "challenge_type";
    const CODE_COLUMN: Option<&'static str> = Some("code");
    const CACHED_PREDICATES: &'static [&'static str] = &["focusArea", "formatType"];

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
        self.attributes.validate()
    }

    fn from_seed(record: Value) -> Result<Self, String> {
        from_record(record)
    }
}

impl ConfigEntity for ChallengeType {
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

pub type ChallengeTypeRepository = EntityRepository<ChallengeType>;

impl<M: RowMapper<ChallengeType>> EntityRepository<ChallengeType, M> {
    /// Active challenge types that apply to the focus area `code`
    pub async fn find_by_focus_area(&self, code: &str) -> Result<Vec<ChallengeType>, DomainError> {
        self.find_by(
            "focusArea",
            code,
            FilterCondition::contains("focus_areas", code),
        )
        .await
    }

    /// Active challenge types answerable in the format type `code`
    pub async fn find_by_format_type(
        &self,
        code: &str,
    ) -> Result<Vec<ChallengeType>, DomainError> {
        self.find_by(
            "formatType",
            code,
            FilterCondition::contains("format_types", code),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_focus_area_is_idempotent() {
        let mut kind = ChallengeType::new("debugging", "Debugging");
        assert!(kind.add_focus_area("fa1"));
        assert!(!kind.add_focus_area("fa1"));
        assert_eq!(kind.focus_areas, vec!["fa1"]);
        assert_eq!(kind.pending_events().len(), 1);
        assert_eq!(kind.pending_events()[0].payload["added"], "fa1");
    }

    #[test]
    fn test_supports_format() {
        let kind = ChallengeType::new("debugging", "Debugging")
            .with_format_types(vec!["code".into()]);
        assert!(kind.supports_format("code"));
        assert!(!kind.supports_format("essay"));
    }
}
