//! NATS event bus

use async_nats::Client;
use async_trait::async_trait;
use std::time::Duration;

use super::{DomainEvent, EventBus, EventBusError};
use crate::config::NatsConfig;
use crate::error::{sanitize_url, Error, Result};

/// Connect to NATS, retrying with exponential backoff
pub async fn create_client(config: &NatsConfig) -> Result<Client> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_client(config).await {
            Ok(client) => {
                if attempt > 0 {
                    tracing::info!(
                        attempts = attempt + 1,
                        "NATS connection established after retry"
                    );
                } else {
                    tracing::info!(url = %sanitize_url(&config.url), "NATS client connected");
                }
                return Ok(client);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        attempts = config.max_retries + 1,
                        error = %e,
                        "Failed to connect to NATS"
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));
                tracing::warn!(attempt, error = %e, ?delay, "NATS connection attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_client(config: &NatsConfig) -> Result<Client> {
    let mut opts = async_nats::ConnectOptions::new().max_reconnects(Some(config.max_reconnects));
    if let Some(name) = &config.name {
        opts = opts.name(name);
    }

    opts.connect(&config.url).await.map_err(|e| {
        Error::Nats(format!(
            "Failed to connect to NATS server at '{}': {}",
            sanitize_url(&config.url),
            e
        ))
    })
}

/// Publishes events as JSON to `<prefix>.<entity_type>.<event_type>`
#[derive(Clone)]
pub struct NatsEventBus {
    client: Client,
    subject_prefix: String,
}

impl NatsEventBus {
    pub fn new(client: Client, subject_prefix: impl Into<String>) -> Self {
        Self {
            client,
            subject_prefix: subject_prefix.into(),
        }
    }

    pub fn subject(&self, event: &DomainEvent) -> String {
        subject_for(&self.subject_prefix, event)
    }
}

fn subject_for(prefix: &str, event: &DomainEvent) -> String {
    format!("{}.{}.{}", prefix, event.entity_type, event.event_type)
}

#[async_trait]
impl EventBus for NatsEventBus {
    async fn publish(&self, event: &DomainEvent) -> std::result::Result<(), EventBusError> {
        let payload = serde_json::to_vec(event).map_err(|e| EventBusError::Serialization {
            event_type: event.event_type.clone(),
            message: e.to_string(),
        })?;

        let subject = self.subject(event);
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| EventBusError::Publish {
                event_type: event.event_type.clone(),
                message: format!("{}: {}", subject, e),
            })
    }
}
