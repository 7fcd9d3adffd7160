//! Repository set shared by an application
//!
//! [`Repositories`] holds one repository per entity type. All of them share
//! the same storage, cache and event bus, chosen from [`Config`]:
//!
//! | concern | configured backend | fallback |
//! |---------|-------------------|----------|
//! | storage | PostgreSQL (`database`) | [`MemoryStorage`] |
//! | cache   | Redis (`cache`) | [`MemoryCache`], or [`NoopCache`] when disabled |
//! | events  | NATS (`events`) | [`InMemoryEventBus`], or [`NoopEventBus`] when disabled |

use std::sync::Arc;

use crate::cache::{CacheBackend, CachePolicy, MemoryCache, NoopCache};
use crate::config::Config;
use crate::domain::{
    ChallengeRepository, ChallengeTypeRepository, DifficultyLevelRepository, FocusAreaRepository,
    FormatTypeRepository,
};
use crate::error::Result;
use crate::events::{EventBus, InMemoryEventBus, NoopEventBus};
use crate::repository::{Entity, EntityRepository};
use crate::storage::{MemoryStorage, StorageBackend};

/// Repositories for every entity type, sharing their backends
#[derive(Clone)]
pub struct Repositories {
    config: Arc<Config>,
    storage: Arc<dyn StorageBackend>,
    cache: Arc<dyn CacheBackend>,
    events: Arc<dyn EventBus>,

    pub focus_areas: FocusAreaRepository,
    pub format_types: FormatTypeRepository,
    pub difficulty_levels: DifficultyLevelRepository,
    pub challenge_types: ChallengeTypeRepository,
    pub challenges: ChallengeRepository,
}

impl Repositories {
    pub fn builder() -> RepositoriesBuilder {
        RepositoriesBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.cache
    }

    pub fn events(&self) -> &Arc<dyn EventBus> {
        &self.events
    }

    fn assemble(
        config: Config,
        storage: Arc<dyn StorageBackend>,
        cache: Arc<dyn CacheBackend>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        let policy = CachePolicy::from(&config.cache);
        Self {
            focus_areas: repository(&storage, &cache, &events, policy),
            format_types: repository(&storage, &cache, &events, policy),
            difficulty_levels: repository(&storage, &cache, &events, policy),
            challenge_types: repository(&storage, &cache, &events, policy),
            challenges: repository(&storage, &cache, &events, policy),
            config: Arc::new(config),
            storage,
            cache,
            events,
        }
    }
}

fn repository<E: Entity>(
    storage: &Arc<dyn StorageBackend>,
    cache: &Arc<dyn CacheBackend>,
    events: &Arc<dyn EventBus>,
    policy: CachePolicy,
) -> EntityRepository<E> {
    EntityRepository::new(Arc::clone(storage))
        .with_cache(Arc::clone(cache), policy)
        .with_events(Arc::clone(events))
}

/// In-memory storage with the unique code constraints of the schema
fn memory_storage() -> MemoryStorage {
    ["focus_areas", "format_types", "difficulty_levels", "challenge_types"]
        .into_iter()
        .fold(MemoryStorage::new(), |storage, table| {
            storage.with_unique(table, "code")
        })
}

fn cache_for(config: &Config, provided: Option<Arc<dyn CacheBackend>>) -> Arc<dyn CacheBackend> {
    if !config.cache.enabled {
        tracing::info!("Caching disabled");
        return Arc::new(NoopCache);
    }
    provided.unwrap_or_else(|| Arc::new(MemoryCache::new()))
}

fn events_for(config: &Config, provided: Option<Arc<dyn EventBus>>) -> Arc<dyn EventBus> {
    if !config.events.enabled {
        tracing::info!("Event publication disabled");
        return Arc::new(NoopEventBus);
    }
    provided.unwrap_or_else(|| Arc::new(InMemoryEventBus::new()))
}

/// Builder for [`Repositories`]
///
/// Explicitly provided backends take precedence over the ones described in
/// the configuration.
#[derive(Default)]
pub struct RepositoriesBuilder {
    config: Option<Config>,
    storage: Option<Arc<dyn StorageBackend>>,
    cache: Option<Arc<dyn CacheBackend>>,
    events: Option<Arc<dyn EventBus>>,
}

impl RepositoriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this storage instead of connecting to `database.url`
    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use this cache instead of connecting to `redis.url`
    ///
    /// Ignored when `cache.enabled` is false.
    pub fn cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use this bus instead of connecting to `nats.url`
    ///
    /// Ignored when `events.enabled` is false.
    pub fn events(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Connect the configured backends and build the repositories
    ///
    /// Connection failures are returned after the backend's own retries.
    pub async fn build(self) -> Result<Repositories> {
        let config = self.config.unwrap_or_default();

        let storage = match self.storage {
            Some(storage) => storage,
            None => connect_storage(&config).await?,
        };

        let cache = match self.cache {
            Some(cache) => Some(cache),
            None if config.cache.enabled => connect_cache(&config).await?,
            None => None,
        };
        let cache = cache_for(&config, cache);

        let events = match self.events {
            Some(events) => Some(events),
            None if config.events.enabled => connect_events(&config).await?,
            None => None,
        };
        let events = events_for(&config, events);

        Ok(Repositories::assemble(config, storage, cache, events))
    }
}

#[cfg(feature = "database")]
async fn connect_storage(config: &Config) -> Result<Arc<dyn StorageBackend>> {
    match &config.database {
        Some(db_config) => {
            let pool = crate::storage::create_pool(db_config).await?;
            Ok(Arc::new(crate::storage::PgStorage::new(pool)))
        }
        None => {
            tracing::info!("No database configured, using in-memory storage");
            Ok(Arc::new(memory_storage()))
        }
    }
}

#[cfg(not(feature = "database"))]
async fn connect_storage(config: &Config) -> Result<Arc<dyn StorageBackend>> {
    if config.database.is_some() {
        tracing::warn!("database configured but the `database` feature is disabled, using in-memory storage");
    }
    Ok(Arc::new(memory_storage()))
}

#[cfg(feature = "cache")]
async fn connect_cache(config: &Config) -> Result<Option<Arc<dyn CacheBackend>>> {
    match &config.redis {
        Some(redis_config) => {
            let pool = crate::cache::create_pool(redis_config).await?;
            Ok(Some(Arc::new(crate::cache::RedisCache::new(
                pool,
                redis_config.key_prefix.clone(),
            ))))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "cache"))]
async fn connect_cache(config: &Config) -> Result<Option<Arc<dyn CacheBackend>>> {
    if config.redis.is_some() {
        tracing::warn!("redis configured but the `cache` feature is disabled, using in-memory cache");
    }
    Ok(None)
}

#[cfg(feature = "events")]
async fn connect_events(config: &Config) -> Result<Option<Arc<dyn EventBus>>> {
    match &config.nats {
        Some(nats_config) => {
            let client = crate::events::create_client(nats_config).await?;
            Ok(Some(Arc::new(crate::events::NatsEventBus::new(
                client,
                config.events.subject_prefix.clone(),
            ))))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "events"))]
async fn connect_events(config: &Config) -> Result<Option<Arc<dyn EventBus>>> {
    if config.nats.is_some() {
        tracing::warn!("nats configured but the `events` feature is disabled, using in-memory bus");
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Challenge, FocusArea, NewChallenge};

    #[tokio::test]
    async fn test_builder_defaults_to_in_memory_backends() {
        let repos = Repositories::builder().build().await.unwrap();
        assert!(repos.cache().supports_pattern_delete());

        let mut area = FocusArea::new("fa1", "Fundamentals");
        repos.focus_areas.save(&mut area).await.unwrap();
        assert!(repos.focus_areas.find_by_code("fa1").await.unwrap().is_some());
        assert!(repos.format_types.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repositories_share_the_event_bus() {
        let bus = InMemoryEventBus::new();
        let repos = Repositories::builder()
            .events(Arc::new(bus.clone()))
            .build()
            .await
            .unwrap();

        repos
            .focus_areas
            .save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();
        let mut challenge = Challenge::create(NewChallenge {
            title: "Warm-up".into(),
            user_email: "a@example.com".into(),
            focus_area: "fa1".into(),
            challenge_type: "quiz".into(),
            format_type: "text".into(),
            difficulty: "easy".into(),
            content: serde_json::Value::Null,
        })
        .unwrap();
        repos.challenges.save(&mut challenge).await.unwrap();

        assert_eq!(
            bus.event_types(),
            vec!["FocusAreaCreated", "ChallengeCreated"]
        );
    }

    #[tokio::test]
    async fn test_disabled_cache_and_events_use_noop_backends() {
        let mut config = Config::default();
        config.cache.enabled = false;
        config.events.enabled = false;

        let bus = InMemoryEventBus::new();
        let repos = Repositories::builder()
            .config(config)
            .events(Arc::new(bus.clone()))
            .build()
            .await
            .unwrap();

        repos
            .focus_areas
            .save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();
        assert!(bus.published().is_empty());
        assert!(repos.cache().get("focusArea:code:fa1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_storage_enforces_unique_codes() {
        let storage = memory_storage();
        let repos = Repositories::builder()
            .storage(Arc::new(storage.clone()))
            .build()
            .await
            .unwrap();

        repos
            .difficulty_levels
            .seed(serde_json::json!([
                {"code": "easy", "name": "Easy", "level": 1},
                {"code": "hard", "name": "Hard", "level": 3}
            ]))
            .await
            .unwrap();
        assert_eq!(storage.rows("difficulty_levels").len(), 2);
        assert_eq!(
            repos.difficulty_levels.find_by_level(3).await.unwrap()[0]
                .attributes
                .code,
            "hard"
        );
        assert_eq!(repos.config().service.name, "challenge-store");
    }
}
