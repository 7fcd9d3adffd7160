//! Challenges and their lifecycle
//!
//! ```text
//! draft ──> active ──> completed ──┐
//!             │ ──> expired   ─────┼──> archived ──> deleted
//!             └ ──> cancelled ─────┘
//! ```
//!
//! Every status may also move straight to `deleted`, which is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::events::DomainEvent;
use crate::ids::EntityId;
use crate::repository::{
    is_valid_transition, DomainError, Entity, EntityRepository, Lifecycle, RowMapper,
};
use crate::storage::{FilterCondition, OrderBy, OrderDirection};

/// Challenge status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Draft,
    Active,
    Completed,
    Expired,
    Cancelled,
    Archived,
    Deleted,
}

impl ChallengeStatus {
    pub const ALL: [ChallengeStatus; 7] = [
        Self::Draft,
        Self::Active,
        Self::Completed,
        Self::Expired,
        Self::Cancelled,
        Self::Archived,
        Self::Deleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeStatus {
    type Err = ChallengeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ChallengeError::UnknownStatus(s.to_string()))
    }
}

impl Lifecycle for ChallengeStatus {
    fn allowed_transitions(self) -> &'static [Self] {
        use ChallengeStatus::*;
        match self {
            Draft => &[Active, Deleted],
            Active => &[Completed, Expired, Cancelled, Deleted],
            Completed | Expired | Cancelled => &[Archived, Deleted],
            Archived => &[Deleted],
            Deleted => &[],
        }
    }
}

/// Rejected challenge business operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    #[error("Cannot move challenge from {from} to {to}")]
    InvalidTransition {
        from: ChallengeStatus,
        to: ChallengeStatus,
    },

    #[error("Unknown challenge status '{0}'")]
    UnknownStatus(String),

    #[error("Only completed challenges can be evaluated (status is {0})")]
    NotCompleted(ChallengeStatus),

    #[error("Score {0} is outside 0..=100")]
    InvalidScore(u8),

    #[error("Invalid challenge: {0}")]
    Invalid(String),
}

/// Result of grading a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// 0 to 100
    pub score: u8,
    pub feedback: String,
    pub evaluated_at: DateTime<Utc>,
}

/// Input for [`Challenge::create`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    pub user_email: String,
    pub focus_area: String,
    pub challenge_type: String,
    pub format_type: String,
    pub difficulty: String,
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: EntityId,
    pub title: String,
    pub user_email: String,
    /// Focus area code
    pub focus_area: String,
    /// Challenge type code
    pub challenge_type: String,
    /// Format type code
    pub format_type: String,
    /// Difficulty level code
    pub difficulty: String,
    pub status: ChallengeStatus,
    /// Generated prompt material, opaque to storage
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Challenge {
    /// Create a draft challenge; raises `ChallengeCreated`
    pub fn create(input: NewChallenge) -> Result<Self, ChallengeError> {
        let mut challenge = Self {
            id: EntityId::generate(Self::ID_PREFIX),
            title: input.title,
            user_email: input.user_email,
            focus_area: input.focus_area,
            challenge_type: input.challenge_type,
            format_type: input.format_type,
            difficulty: input.difficulty,
            status: ChallengeStatus::Draft,
            content: input.content,
            response: None,
            evaluation: None,
            completed_at: None,
            created_at: None,
            updated_at: None,
            events: Vec::new(),
        };
        challenge.check().map_err(ChallengeError::Invalid)?;

        let payload = json!({
            "id": challenge.id,
            "title": challenge.title,
            "user_email": challenge.user_email,
            "focus_area": challenge.focus_area,
            "difficulty": challenge.difficulty,
        });
        challenge.raise("ChallengeCreated", payload);
        Ok(challenge)
    }

    pub fn activate(&mut self) -> Result<(), ChallengeError> {
        self.transition(ChallengeStatus::Active, "ChallengeActivated", json!({}))
    }

    /// Record the user's answer and complete the challenge
    pub fn submit_response(&mut self, response: impl Into<String>) -> Result<(), ChallengeError> {
        let response = response.into();
        if response.trim().is_empty() {
            return Err(ChallengeError::Invalid("response must not be empty".into()));
        }
        self.transition(
            ChallengeStatus::Completed,
            "ChallengeCompleted",
            json!({ "response_length": response.chars().count() }),
        )?;
        self.response = Some(response);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Grade a completed challenge; the status does not change
    pub fn evaluate(&mut self, score: u8, feedback: impl Into<String>) -> Result<(), ChallengeError> {
        if self.status != ChallengeStatus::Completed {
            return Err(ChallengeError::NotCompleted(self.status));
        }
        if score > 100 {
            return Err(ChallengeError::InvalidScore(score));
        }

        self.evaluation = Some(Evaluation {
            score,
            feedback: feedback.into(),
            evaluated_at: Utc::now(),
        });
        self.updated_at = Some(Utc::now());
        self.raise("ChallengeEvaluated", json!({ "id": self.id, "score": score }));
        Ok(())
    }

    pub fn expire(&mut self) -> Result<(), ChallengeError> {
        self.transition(ChallengeStatus::Expired, "ChallengeExpired", json!({}))
    }

    pub fn cancel(&mut self, reason: Option<&str>) -> Result<(), ChallengeError> {
        self.transition(
            ChallengeStatus::Cancelled,
            "ChallengeCancelled",
            json!({ "reason": reason }),
        )
    }

    pub fn archive(&mut self) -> Result<(), ChallengeError> {
        self.transition(ChallengeStatus::Archived, "ChallengeArchived", json!({}))
    }

    /// Move to the terminal `deleted` status; the row stays in storage
    pub fn mark_deleted(&mut self) -> Result<(), ChallengeError> {
        self.transition(ChallengeStatus::Deleted, "ChallengeDeleted", json!({}))
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluation.is_some()
    }

    fn transition(
        &mut self,
        to: ChallengeStatus,
        event_type: &str,
        extra: Value,
    ) -> Result<(), ChallengeError> {
        let from = self.status;
        if from == to || !is_valid_transition(from, to) {
            return Err(ChallengeError::InvalidTransition { from, to });
        }

        self.status = to;
        self.updated_at = Some(Utc::now());

        let mut payload = json!({
            "id": self.id,
            "from": from,
            "to": to,
        });
        if let (Value::Object(payload), Value::Object(extra)) = (&mut payload, extra) {
            payload.extend(extra);
        }
        self.raise(event_type, payload);
        Ok(())
    }

    fn raise(&mut self, event_type: &str, payload: Value) {
        let event = DomainEvent::new(Self::ENTITY_TYPE, self.id.as_str(), event_type, payload);
        self.events.push(event);
    }

    fn check(&self) -> Result<(), String> {
        let required = [
            ("title", &self.title),
            ("user_email", &self.user_email),
            ("focus_area", &self.focus_area),
            ("challenge_type", &self.challenge_type),
            ("format_type", &self.format_type),
            ("difficulty", &self.difficulty),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(format!("{} is required", field));
        }
        if !self.user_email.contains('@') {
            return Err(format!("'{}' is not an email address", self.user_email));
        }
        if self.evaluation.as_ref().is_some_and(|e| e.score > 100) {
            return Err("evaluation score must be between 0 and 100".into());
        }
        Ok(())
    }
}

impl Entity for Challenge {
    type Status = ChallengeStatus;
    const ENTITY_TYPE: &'static str = "Challenge";
    const CACHE_NAMESPACE: &'static str = "challenge";
    const TABLE: &'static str = "challenges";
    const ID_PREFIX: &'static str = "challenge";
    const CACHED_PREDICATES: &'static [&'static str] =
        &["userEmail", "focusArea", "status", "statuses"];

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn status(&self) -> Option<ChallengeStatus> {
        Some(self.status)
    }

    fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn active_filter() -> FilterCondition {
        FilterCondition::ne("status", ChallengeStatus::Deleted.as_str())
    }

    fn default_order() -> Vec<OrderBy> {
        vec![OrderBy {
            field: "created_at".into(),
            direction: OrderDirection::Descending,
        }]
    }

    fn validate(&self) -> Result<(), String> {
        self.check()
    }

    fn from_seed(record: Value) -> Result<Self, String> {
        let input: NewChallenge =
            serde_json::from_value(record).map_err(|e| format!("invalid Challenge record: {}", e))?;
        Self::create(input).map_err(|e| e.to_string())
    }

    fn creation_payload(&self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "user_email": self.user_email,
        })
    }
}

pub type ChallengeRepository = EntityRepository<Challenge>;

impl<M: RowMapper<Challenge>> EntityRepository<Challenge, M> {
    /// Newest first
    pub async fn find_by_user_email(&self, email: &str) -> Result<Vec<Challenge>, DomainError> {
        self.find_by("userEmail", email, FilterCondition::eq("user_email", email))
            .await
    }

    pub async fn find_by_focus_area(&self, code: &str) -> Result<Vec<Challenge>, DomainError> {
        self.find_by("focusArea", code, FilterCondition::eq("focus_area", code))
            .await
    }

    /// Deleted challenges are never returned, even for `ChallengeStatus::Deleted`
    pub async fn find_by_status(
        &self,
        status: ChallengeStatus,
    ) -> Result<Vec<Challenge>, DomainError> {
        self.find_by(
            "status",
            status.as_str(),
            FilterCondition::eq("status", status.as_str()),
        )
        .await
    }

    pub async fn find_by_statuses(
        &self,
        statuses: &[ChallengeStatus],
    ) -> Result<Vec<Challenge>, DomainError> {
        let values: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        self.find_by_any(
            "statuses",
            &values,
            FilterCondition::in_list("status", values.clone()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_challenge() -> Challenge {
        Challenge::create(NewChallenge {
            title: "Fix the flaky test".into(),
            user_email: "learner@example.com".into(),
            focus_area: "testing".into(),
            challenge_type: "debugging".into(),
            format_type: "code".into(),
            difficulty: "medium".into(),
            content: json!({"prompt": "Why does this test fail on CI?"}),
        })
        .unwrap()
    }

    #[test]
    fn test_transition_table() {
        use ChallengeStatus::*;
        assert!(is_valid_transition(Draft, Active));
        assert!(is_valid_transition(Active, Completed));
        assert!(is_valid_transition(Completed, Archived));
        assert!(is_valid_transition(Archived, Deleted));
        assert!(is_valid_transition(Completed, Completed));
        assert!(!is_valid_transition(Completed, Active));
        assert!(!is_valid_transition(Draft, Completed));
        assert!(!is_valid_transition(Deleted, Draft));
        assert!(Deleted.is_terminal());
    }

    #[test]
    fn test_create_raises_created_event() {
        let challenge = new_challenge();
        assert_eq!(challenge.status, ChallengeStatus::Draft);
        assert_eq!(challenge.pending_events().len(), 1);
        assert_eq!(challenge.pending_events()[0].event_type, "ChallengeCreated");
        assert_eq!(
            challenge.pending_events()[0].payload["user_email"],
            "learner@example.com"
        );
    }

    #[test]
    fn test_create_validates_input() {
        let err = Challenge::create(NewChallenge {
            user_email: "not-an-email".into(),
            ..new_input()
        })
        .unwrap_err();
        assert!(matches!(err, ChallengeError::Invalid(_)));

        let err = Challenge::create(NewChallenge {
            title: "  ".into(),
            ..new_input()
        })
        .unwrap_err();
        assert_eq!(err, ChallengeError::Invalid("title is required".into()));
    }

    fn new_input() -> NewChallenge {
        NewChallenge {
            title: "t".into(),
            user_email: "a@example.com".into(),
            focus_area: "fa".into(),
            challenge_type: "ct".into(),
            format_type: "ft".into(),
            difficulty: "d".into(),
            content: Value::Null,
        }
    }

    #[test]
    fn test_full_lifecycle_events_in_order() {
        let mut challenge = new_challenge();
        challenge.activate().unwrap();
        challenge.submit_response("It depends on wall-clock time").unwrap();
        challenge.evaluate(85, "Good diagnosis").unwrap();
        challenge.archive().unwrap();

        let types: Vec<_> = challenge
            .pending_events()
            .iter()
            .map(|e| e.event_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                "ChallengeCreated",
                "ChallengeActivated",
                "ChallengeCompleted",
                "ChallengeEvaluated",
                "ChallengeArchived"
            ]
        );
        assert_eq!(challenge.status, ChallengeStatus::Archived);
        assert_eq!(challenge.evaluation.as_ref().map(|e| e.score), Some(85));
        assert!(challenge.completed_at.is_some());
    }

    #[test]
    fn test_illegal_moves_are_refused_in_memory() {
        let mut challenge = new_challenge();
        assert_eq!(
            challenge.submit_response("early"),
            Err(ChallengeError::InvalidTransition {
                from: ChallengeStatus::Draft,
                to: ChallengeStatus::Completed
            })
        );
        assert_eq!(
            challenge.evaluate(50, "x"),
            Err(ChallengeError::NotCompleted(ChallengeStatus::Draft))
        );
        challenge.activate().unwrap();
        assert!(challenge.activate().is_err());
        assert_eq!(challenge.pending_events().len(), 2);
    }

    #[test]
    fn test_score_bounds() {
        let mut challenge = new_challenge();
        challenge.activate().unwrap();
        challenge.submit_response("answer").unwrap();
        assert_eq!(
            challenge.evaluate(101, "x"),
            Err(ChallengeError::InvalidScore(101))
        );
        assert!(!challenge.is_evaluated());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "Completed".parse::<ChallengeStatus>(),
            Ok(ChallengeStatus::Completed)
        );
        assert!("finished".parse::<ChallengeStatus>().is_err());
        assert_eq!(
            serde_json::to_value(ChallengeStatus::Cancelled).unwrap(),
            json!("cancelled")
        );
    }

    #[test]
    fn test_seed_builds_draft_challenge() {
        let challenge = Challenge::from_seed(json!({
            "title": "Seeded",
            "user_email": "seed@example.com",
            "focus_area": "fa1",
            "challenge_type": "ct",
            "format_type": "code",
            "difficulty": "easy"
        }))
        .unwrap();
        assert_eq!(challenge.status, ChallengeStatus::Draft);
        assert!(Challenge::from_seed(json!({"title": "missing fields"})).is_err());
    }
}
