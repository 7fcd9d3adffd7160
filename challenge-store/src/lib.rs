//! # challenge-store
//!
//! Transactional entity repositories for a learning-challenge platform.
//!
//! ## Features
//!
//! - **Generic repository**: one [`repository::EntityRepository`] per entity
//!   type, with find, upsert, delete and bulk seed
//! - **Status guard**: lifecycle tables checked before status-changing writes
//! - **Domain events**: raised by entities, published in order after commit
//! - **Cache-aside reads**: namespaced keys evicted on every write
//! - **Error mapping**: storage failures surface as per-entity domain errors
//! - **Backends**: PostgreSQL, Redis and NATS behind the `database`, `cache`
//!   and `events` features, with in-memory fallbacks
//!
//! ## Example
//!
//! ```rust,no_run
//! use challenge_store::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let repos = Repositories::builder().config(config).build().await?;
//!
//!     let mut area = FocusArea::new("fa1", "Fundamentals");
//!     repos.focus_areas.save(&mut area).await?;
//!
//!     let mut challenge = Challenge::create(NewChallenge {
//!         title: "Reverse a list".into(),
//!         user_email: "learner@example.com".into(),
//!         focus_area: "fa1".into(),
//!         challenge_type: "coding".into(),
//!         format_type: "code".into(),
//!         difficulty: "easy".into(),
//!         content: serde_json::Value::Null,
//!     })?;
//!     challenge.activate()?;
//!     repos.challenges.save(&mut challenge).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod ids;
pub mod observability;
pub mod repository;
pub mod state;
pub mod storage;

pub mod prelude {
    //! Common imports

    pub use crate::cache::{CacheBackend, CacheKeys, CachePolicy, MemoryCache, NoopCache};
    pub use crate::config::Config;
    pub use crate::domain::{
        Challenge, ChallengeError, ChallengeRepository, ChallengeStatus, ChallengeType,
        ChallengeTypeRepository, ConfigEntity, DetailsUpdate, DifficultyLevel,
        DifficultyLevelRepository, FocusArea, FocusAreaRepository, FormatType,
        FormatTypeRepository, NewChallenge,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{DomainEvent, EventBus, InMemoryEventBus, NoopEventBus};
    pub use crate::ids::EntityId;
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        is_valid_transition, DomainError, DomainErrorKind, Entity, EntityRepository, EntityStore,
        ErrorMapping, Lifecycle, RepositoryError, RepositoryErrorKind, SeedReport,
    };
    pub use crate::state::{Repositories, RepositoriesBuilder};
    pub use crate::storage::{FilterCondition, MemoryStorage, StorageBackend};

    #[cfg(feature = "database")]
    pub use crate::storage::PgStorage;

    #[cfg(feature = "cache")]
    pub use crate::cache::RedisCache;

    #[cfg(feature = "events")]
    pub use crate::events::NatsEventBus;

    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, instrument, trace, warn};
    pub use async_trait::async_trait;
    pub use anyhow::{self, Context as AnyhowContext};
    pub use chrono::{DateTime, Utc};
}
