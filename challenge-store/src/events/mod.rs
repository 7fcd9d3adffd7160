//! Domain events and the publish-only event bus
//!
//! Entities collect [`DomainEvent`]s from their business methods. The
//! repository drains them before writing and hands them to an [`EventBus`]
//! only after the write committed, in the order they were raised.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

#[cfg(feature = "events")]
mod nats;

#[cfg(feature = "events")]
pub use nats::{create_client, NatsEventBus};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// An immutable notification describing a state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event id (UUIDv7)
    pub event_id: Uuid,

    /// Event type (e.g. `ChallengeCompleted`)
    pub event_type: String,

    /// Entity type that raised the event
    pub entity_type: String,

    /// Id of the entity that raised the event
    pub entity_id: String,

    /// Event-specific data
    pub payload: Value,

    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event_type.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Event publication failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventBusError {
    #[error("Failed to serialize event {event_type}: {message}")]
    Serialization { event_type: String, message: String },

    #[error("Failed to publish event {event_type}: {message}")]
    Publish { event_type: String, message: String },
}

/// Publish side of a domain event bus
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), EventBusError>;
}

/// Bus that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventBus;

#[async_trait]
impl EventBus for NoopEventBus {
    async fn publish(&self, event: &DomainEvent) -> Result<(), EventBusError> {
        tracing::trace!(event_type = %event.event_type, "Dropping event (no bus configured)");
        Ok(())
    }
}

/// In-process bus
///
/// Events fan out to [`InMemoryEventBus::subscribe`]rs through a
/// `tokio::sync::broadcast` channel and are also kept in a history that
/// [`InMemoryEventBus::published`] returns in publication order.
#[derive(Clone)]
pub struct InMemoryEventBus {
    sender: broadcast::Sender<DomainEvent>,
    history: Arc<Mutex<Vec<DomainEvent>>>,
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Every event published so far
    pub fn published(&self) -> Vec<DomainEvent> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.published()
            .into_iter()
            .map(|event| event.event_type)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: &DomainEvent) -> Result<(), EventBusError> {
        self.history
            .lock()
            .map_err(|e| EventBusError::Publish {
                event_type: event.event_type.clone(),
                message: e.to_string(),
            })?
            .push(event.clone());

        // No subscribers is not an error
        let receivers = self.sender.send(event.clone()).unwrap_or(0);
        tracing::debug!(
            event_type = %event.event_type,
            entity_type = %event.entity_type,
            receivers,
            "Event published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_bus_records_and_fans_out_in_order() {
        let bus = InMemoryEventBus::new();
        let mut rx = bus.subscribe();

        for kind in ["ChallengeCreated", "ChallengeActivated"] {
            let event = DomainEvent::new("Challenge", "challenge_1", kind, json!({}));
            bus.publish(&event).await.unwrap();
        }

        assert_eq!(
            bus.event_types(),
            vec!["ChallengeCreated", "ChallengeActivated"]
        );
        assert_eq!(rx.recv().await.unwrap().event_type, "ChallengeCreated");
        assert_eq!(rx.recv().await.unwrap().event_type, "ChallengeActivated");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let bus = InMemoryEventBus::new();
        let event = DomainEvent::new("FocusArea", "focus_area_1", "FocusAreaCreated", json!({}));
        assert!(bus.publish(&event).await.is_ok());
        assert_eq!(bus.published().len(), 1);

        bus.clear();
        assert!(bus.published().is_empty());
    }

    #[test]
    fn test_event_serializes_with_timestamp() {
        let event = DomainEvent::new("FocusArea", "focus_area_1", "FocusAreaCreated", json!({"code": "fa1"}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "FocusAreaCreated");
        assert_eq!(value["payload"]["code"], "fa1");
        assert!(value["timestamp"].is_string());
    }
}
