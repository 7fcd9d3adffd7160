//! Difficulty levels

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{catalogue_order, from_record, ConfigAttributes, ConfigEntity};
use crate::events::DomainEvent;
use crate::ids::EntityId;
use crate::repository::{
    DomainError, Entity, EntityRepository, NoStatus, RepositoryError, RepositoryOperation,
    RowMapper,
};
use crate::storage::{FilterCondition, OrderBy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyLevel {
    pub id: EntityId,
    #[serde(flatten)]
    pub attributes: ConfigAttributes,
    /// Numeric rank, 1 is easiest
    pub level: u8,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    /// Scales evaluation scores; must be positive
    #[serde(default = "default_multiplier")]
    pub complexity_multiplier: f64,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl DifficultyLevel {
    pub fn new(code: impl Into<String>, name: impl Into<String>, level: u8) -> Self {
        Self {
            id: EntityId::generate(Self::ID_PREFIX),
            attributes: ConfigAttributes::new(code, name),
            level,
            time_limit_minutes: None,
            complexity_multiplier: default_multiplier(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_time_limit(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn with_complexity_multiplier(mut self, multiplier: f64) -> Self {
        self.complexity_multiplier = multiplier;
        self
    }
}

impl Entity for DifficultyLevel {
    type Status = NoStatus;
    const ENTITY_TYPE: &'static str = "DifficultyLevel";
    const CACHE_NAMESPACE: &'static str = "difficultyLevel";
    const TABLE: &'static str = "difficulty_levels";
    const ID_PREFIX: &'static str = "difficulty_level";
    const CODE_COLUMN: Option<&'static str> = Some("code");
    const CACHED_PREDICATES: &'static [&'static str] = &["level"];

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
        if self.level == 0 {
            return Err(format!("level must be at least 1 for '{}'", self.attributes.code));
        }
        if !(self.complexity_multiplier.is_finite() && self.complexity_multiplier > 0.0) {
            return Err(format!(
                "complexity_multiplier must be positive for '{}'",
                self.attributes.code
            ));
        }
        if self.time_limit_minutes == Some(0) {
            return Err(format!(
                "time_limit_minutes must be positive for '{}'",
                self.attributes.code
            ));
        }
        Ok(())
    }

    fn from_seed(record: Value) -> Result<Self, String> {
        from_record(record)
    }
}

impl ConfigEntity for DifficultyLevel {
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

pub type DifficultyLevelRepository = EntityRepository<DifficultyLevel>;

impl<M: RowMapper<DifficultyLevel>> EntityRepository<DifficultyLevel, M> {
    pub async fn find_by_level(&self, level: u8) -> Result<Vec<DifficultyLevel>, DomainError> {
        if level == 0 {
            return Err(self.error_mapping().map(
                RepositoryError::validation_failed(
                    RepositoryOperation::FindBy,
                    "level must be at least 1",
                )
                .with_entity_type(DifficultyLevel::ENTITY_TYPE),
            ));
        }
        self.find_by(
            "level",
            &level.to_string(),
            FilterCondition::eq("level", level),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_rules() {
        assert!(DifficultyLevel::new("easy", "Easy", 1).validate().is_ok());
        assert!(DifficultyLevel::new("none", "None", 0).validate().is_err());
        assert!(DifficultyLevel::new("odd", "Odd", 2)
            .with_complexity_multiplier(0.0)
            .validate()
            .is_err());
        assert!(DifficultyLevel::new("odd", "Odd", 2)
            .with_time_limit(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_integer_multiplier_in_seed() {
        let level = DifficultyLevel::from_seed(json!({
            "code": "hard",
            "name": "Hard",
            "level": 3,
            "complexity_multiplier": 2,
            "time_limit_minutes": 45
        }))
        .unwrap();
        assert_eq!(level.complexity_multiplier, 2.0);
        assert_eq!(level.time_limit_minutes, Some(45));
    }
}
