//! Generic entity repository
//!
//! One [`EntityRepository`] per entity type holds its collaborators: storage,
//! a cache (the no-op cache when none is configured), an event bus and the
//! error mapping table. Every public method runs its body against
//! [`RepositoryError`] and maps the result once on the way out.
//!
//! Write path, in order:
//! 1. detach pending events from the entity
//! 2. look up the stored record by business key
//! 3. run the status guard when the status changes
//! 4. insert or update
//! 5. evict every cache key the write could affect
//! 6. publish the detached events (or a synthesized `<Entity>Created`)
//!
//! Cache eviction and publication failures are logged and never fail the
//! write; storage failures always do.

use dashmap::DashSet;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use super::error::{RepositoryError, RepositoryOperation};
use super::lifecycle::is_valid_transition;
use super::mapping::{DomainError, ErrorMapping};
use super::traits::{Entity, EntityStore, RepositoryResult, RowMapError, RowMapper, SerdeMapper};
use crate::cache::{CacheBackend, CacheKeys, CachePolicy, NoopCache};
use crate::events::{DomainEvent, EventBus, NoopEventBus};
use crate::storage::{FilterCondition, Query, Row, StorageBackend, StorageError};

/// Outcome of a bulk seed
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    /// Records received
    pub attempted: usize,
    /// Records persisted
    pub saved: usize,
    pub failures: Vec<SeedFailure>,
}

impl SeedReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A seed record that could not be persisted
#[derive(Debug, Clone)]
pub struct SeedFailure {
    /// Position in the input array
    pub index: usize,
    /// The record's code, when it had one
    pub code: Option<String>,
    pub error: DomainError,
}

/// Repository for one entity type
pub struct EntityRepository<E: Entity, M: RowMapper<E> = SerdeMapper> {
    storage: Arc<dyn StorageBackend>,
    cache: Arc<dyn CacheBackend>,
    events: Arc<dyn EventBus>,
    mapper: M,
    keys: CacheKeys,
    policy: CachePolicy,
    mapping: ErrorMapping,
    // Predicate keys written so far, for caches without pattern eviction
    tracked_keys: Arc<DashSet<String>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, M: RowMapper<E> + Clone> Clone for EntityRepository<E, M> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            cache: Arc::clone(&self.cache),
            events: Arc::clone(&self.events),
            mapper: self.mapper.clone(),
            keys: self.keys.clone(),
            policy: self.policy,
            mapping: self.mapping.clone(),
            tracked_keys: Arc::clone(&self.tracked_keys),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityRepository<E> {
    /// A repository with no cache and no event bus
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            cache: Arc::new(NoopCache),
            events: Arc::new(NoopEventBus),
            mapper: SerdeMapper,
            keys: CacheKeys::new(E::CACHE_NAMESPACE),
            policy: CachePolicy::default(),
            mapping: E::error_mapping(),
            tracked_keys: Arc::new(DashSet::new()),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, M: RowMapper<E>> EntityRepository<E, M> {
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>, policy: CachePolicy) -> Self {
        self.cache = cache;
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_error_mapping(mut self, mapping: ErrorMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Swap the row mapper
    pub fn with_mapper<N: RowMapper<E>>(self, mapper: N) -> EntityRepository<E, N> {
        EntityRepository {
            storage: self.storage,
            cache: self.cache,
            events: self.events,
            mapper,
            keys: self.keys,
            policy: self.policy,
            mapping: self.mapping,
            tracked_keys: self.tracked_keys,
            _entity: PhantomData,
        }
    }

    pub fn cache_keys(&self) -> &CacheKeys {
        &self.keys
    }

    pub fn error_mapping(&self) -> &ErrorMapping {
        &self.mapping
    }

    /// Find an active entity by id
    #[tracing::instrument(skip(self), fields(entity_type = E::ENTITY_TYPE))]
    pub async fn find_by_id(&self, id: &str) -> Result<Option<E>, DomainError> {
        let key = self.keys.id(id);
        self.find_one(RepositoryOperation::FindById, "id", id, key)
            .await
            .map_err(|e| self.mapping.map(e))
    }

    /// Find an active entity by business code
    ///
    /// Entities without a code column are looked up by id instead.
    #[tracing::instrument(skip(self), fields(entity_type = E::ENTITY_TYPE))]
    pub async fn find_by_code(&self, code: &str) -> Result<Option<E>, DomainError> {
        let column = E::CODE_COLUMN.unwrap_or("id");
        let key = self.keys.code(code);
        self.find_one(RepositoryOperation::FindByCode, column, code, key)
            .await
            .map_err(|e| self.mapping.map(e))
    }

    /// All active entities in the entity's default order
    #[tracing::instrument(skip(self), fields(entity_type = E::ENTITY_TYPE))]
    pub async fn find_all(&self) -> Result<Vec<E>, DomainError> {
        let key = self.keys.all();
        self.find_many(
            RepositoryOperation::FindAll,
            key,
            self.policy.collection_ttl,
            Vec::new(),
            None,
        )
        .await
        .map_err(|e| self.mapping.map(e))
    }

    /// Active entities matching `filter`, cached as `<ns>:<predicate>:<value>`
    #[tracing::instrument(skip(self, filter), fields(entity_type = E::ENTITY_TYPE))]
    pub async fn find_by(
        &self,
        predicate: &str,
        value: &str,
        filter: FilterCondition,
    ) -> Result<Vec<E>, DomainError> {
        self.find_by_inner(predicate, value, filter)
            .await
            .map_err(|e| self.mapping.map(e))
    }

    /// Like [`Self::find_by`] for a set-valued argument
    ///
    /// The cache key does not depend on the order of `values`.
    #[tracing::instrument(skip(self, filter), fields(entity_type = E::ENTITY_TYPE))]
    pub async fn find_by_any(
        &self,
        predicate: &str,
        values: &[String],
        filter: FilterCondition,
    ) -> Result<Vec<E>, DomainError> {
        self.find_by_any_inner(predicate, values, filter)
            .await
            .map_err(|e| self.mapping.map(e))
    }

    /// Insert or update by business key
    ///
    /// The entity's pending events are cleared whatever the outcome. The
    /// returned value is rehydrated from the stored row.
    #[tracing::instrument(
        skip(self, entity),
        fields(entity_type = E::ENTITY_TYPE, key = entity.business_key())
    )]
    pub async fn save(&self, entity: &mut E) -> Result<E, DomainError> {
        self.save_inner(entity)
            .await
            .map_err(|e| self.mapping.map(e))
    }

    /// Delete by code (or id); `false` when no record matched
    #[tracing::instrument(skip(self), fields(entity_type = E::ENTITY_TYPE))]
    pub async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        self.delete_inner(key).await.map_err(|e| self.mapping.map(e))
    }

    /// Save one entity per record, collecting failures instead of stopping
    #[tracing::instrument(skip(self, records), fields(entity_type = E::ENTITY_TYPE))]
    pub async fn seed(&self, records: Value) -> Result<SeedReport, DomainError> {
        self.seed_inner(records)
            .await
            .map_err(|e| self.mapping.map(e))
    }

    async fn find_by_inner(
        &self,
        predicate: &str,
        value: &str,
        filter: FilterCondition,
    ) -> RepositoryResult<Vec<E>> {
        self.require(RepositoryOperation::FindBy, predicate, value)?;
        let key = self.keys.predicate(predicate, value);
        self.find_many(
            RepositoryOperation::FindBy,
            key,
            self.policy.query_ttl,
            vec![filter],
            Some(predicate),
        )
        .await
    }

    async fn find_by_any_inner(
        &self,
        predicate: &str,
        values: &[String],
        filter: FilterCondition,
    ) -> RepositoryResult<Vec<E>> {
        if values.is_empty() || values.iter().any(|v| v.trim().is_empty()) {
            return Err(RepositoryError::validation_failed(
                RepositoryOperation::FindBy,
                format!("{} requires at least one non-empty value", predicate),
            )
            .with_entity_type(E::ENTITY_TYPE));
        }
        let key = self.keys.predicate_set(predicate, values);
        self.find_many(
            RepositoryOperation::FindBy,
            key,
            self.policy.query_ttl,
            vec![filter],
            Some(predicate),
        )
        .await
    }

    async fn find_one(
        &self,
        op: RepositoryOperation,
        column: &str,
        value: &str,
        cache_key: String,
    ) -> RepositoryResult<Option<E>> {
        self.require(op, column, value)?;

        if let Some(row) = self.cache_read::<Row>(&cache_key).await {
            match self.mapper.to_domain(row) {
                Ok(entity) => {
                    tracing::debug!(key = %cache_key, "Cache hit");
                    return Ok(Some(entity));
                }
                Err(err) => self.evict_unreadable(&cache_key, &err.to_string()).await,
            }
        }
        tracing::debug!(key = %cache_key, "Cache miss");

        let query = Query::table(E::TABLE)
            .filter(FilterCondition::eq(column, value))
            .filter(E::active_filter());
        let rows = self
            .storage
            .select(&query)
            .await
            .map_err(|e| self.storage_error(op, e, value))?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let entity = self
            .mapper
            .to_domain(row.clone())
            .map_err(|e| self.mapping_error(op, e, value))?;
        self.cache_write(&cache_key, &row, self.policy.entity_ttl).await;
        Ok(Some(entity))
    }

    async fn find_many(
        &self,
        op: RepositoryOperation,
        cache_key: String,
        ttl: Duration,
        filters: Vec<FilterCondition>,
        predicate: Option<&str>,
    ) -> RepositoryResult<Vec<E>> {
        if let Some(rows) = self.cache_read::<Vec<Row>>(&cache_key).await {
            match self.mapper.to_domain_collection(rows) {
                Ok(entities) => {
                    tracing::debug!(key = %cache_key, count = entities.len(), "Cache hit");
                    return Ok(entities);
                }
                Err(err) => self.evict_unreadable(&cache_key, &err.to_string()).await,
            }
        }
        tracing::debug!(key = %cache_key, "Cache miss");

        let query = Query::table(E::TABLE)
            .filters(filters)
            .filter(E::active_filter())
            .ordering(&E::default_order());
        let rows = self
            .storage
            .select(&query)
            .await
            .map_err(|e| self.storage_error(op, e, predicate.unwrap_or("all")))?;

        let entities = self
            .mapper
            .to_domain_collection(rows.clone())
            .map_err(|e| self.mapping_error(op, e, &cache_key))?;

        self.cache_write(&cache_key, &rows, ttl).await;
        // Track only after the entry is stored
        if predicate.is_some() && !self.cache.supports_pattern_delete() {
            self.tracked_keys.insert(cache_key);
        }
        Ok(entities)
    }

    async fn save_inner(&self, entity: &mut E) -> RepositoryResult<E> {
        let events = entity.take_events();
        let key = entity.business_key().to_string();

        entity.validate().map_err(|msg| {
            RepositoryError::validation_failed(RepositoryOperation::Save, msg)
                .with_entity(E::ENTITY_TYPE, &key)
        })?;

        let existing = self.lookup(RepositoryOperation::Save, &key).await?;

        if let Some(current) = &existing {
            if let (Some(from), Some(to)) = (current.status(), entity.status()) {
                if !is_valid_transition(from, to) {
                    tracing::warn!(key = %key, %from, %to, "Rejected status transition");
                    return Err(RepositoryError::invalid_transition(
                        E::ENTITY_TYPE,
                        current.id().as_str(),
                        from,
                        to,
                    ));
                }
            }
        }

        let mut row = self
            .mapper
            .to_persistence(entity)
            .map_err(|e| self.mapping_error(RepositoryOperation::Save, e, &key))?;

        let (stored, inserted) = match &existing {
            Some(current) => {
                let id = current.id().as_str();
                row.insert("id".to_string(), Value::from(id));
                row.remove("created_at");

                let rows = self
                    .storage
                    .update(E::TABLE, row, &[FilterCondition::eq("id", id)])
                    .await
                    .map_err(|e| self.storage_error(RepositoryOperation::Save, e, &key))?;
                let stored = rows.into_iter().next().ok_or_else(|| {
                    RepositoryError::not_found(E::ENTITY_TYPE, &key)
                        .with_operation(RepositoryOperation::Save)
                })?;
                (stored, false)
            }
            None => {
                let stored = self
                    .storage
                    .insert(E::TABLE, row)
                    .await
                    .map_err(|e| self.storage_error(RepositoryOperation::Save, e, &key))?;
                (stored, true)
            }
        };

        tracing::info!(key = %key, inserted, "Entity saved");

        let mut touched = vec![&*entity];
        if let Some(current) = &existing {
            touched.push(current);
        }
        self.invalidate(&touched).await;
        self.publish(events, entity, inserted).await;

        self.mapper
            .to_domain(stored)
            .map_err(|e| self.mapping_error(RepositoryOperation::Save, e, &key))
    }

    async fn delete_inner(&self, key: &str) -> RepositoryResult<bool> {
        self.require(
            RepositoryOperation::Delete,
            E::CODE_COLUMN.unwrap_or("id"),
            key,
        )?;

        let Some(existing) = self.lookup(RepositoryOperation::Delete, key).await? else {
            tracing::debug!(key = %key, "Nothing to delete");
            return Ok(false);
        };

        let removed = self
            .storage
            .delete(
                E::TABLE,
                &[FilterCondition::eq("id", existing.id().as_str())],
            )
            .await
            .map_err(|e| self.storage_error(RepositoryOperation::Delete, e, key))?;

        self.invalidate(&[&existing]).await;
        tracing::info!(key = %key, removed, "Entity deleted");
        Ok(removed > 0)
    }

    async fn seed_inner(&self, records: Value) -> RepositoryResult<SeedReport> {
        let records = match records {
            Value::Array(records) if !records.is_empty() => records,
            Value::Array(_) => {
                return Err(RepositoryError::validation_failed(
                    RepositoryOperation::Seed,
                    "seed input must contain at least one record",
                )
                .with_entity_type(E::ENTITY_TYPE))
            }
            _ => {
                return Err(RepositoryError::validation_failed(
                    RepositoryOperation::Seed,
                    "seed input must be an array of records",
                )
                .with_entity_type(E::ENTITY_TYPE))
            }
        };

        let mut report = SeedReport {
            attempted: records.len(),
            ..Default::default()
        };

        for (index, record) in records.into_iter().enumerate() {
            let code = record
                .get("code")
                .and_then(Value::as_str)
                .map(str::to_owned);

            let result = match E::from_seed(record) {
                Ok(mut entity) => self.save_inner(&mut entity).await,
                Err(msg) => Err(RepositoryError::validation_failed(
                    RepositoryOperation::Seed,
                    msg,
                )
                .with_entity_type(E::ENTITY_TYPE)),
            };

            match result {
                Ok(_) => report.saved += 1,
                Err(err) => {
                    tracing::warn!(index, code = ?code, error = %err, "Seed record failed");
                    report.failures.push(SeedFailure {
                        index,
                        code,
                        error: self.mapping.map(err),
                    });
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            saved = report.saved,
            failed = report.failed(),
            "Seed completed"
        );
        Ok(report)
    }

    /// Stored record for a business key, ignoring the active filter and the cache
    async fn lookup(&self, op: RepositoryOperation, key: &str) -> RepositoryResult<Option<E>> {
        let column = E::CODE_COLUMN.unwrap_or("id");
        let query = Query::table(E::TABLE).filter(FilterCondition::eq(column, key));
        let rows = self
            .storage
            .select(&query)
            .await
            .map_err(|e| self.storage_error(op, e, key))?;

        rows.into_iter()
            .next()
            .map(|row| self.mapper.to_domain(row))
            .transpose()
            .map_err(|e| self.mapping_error(op, e, key))
    }

    /// Evict every key the given versions of an entity could appear under
    async fn invalidate(&self, versions: &[&E]) {
        let mut keys = vec![self.keys.all()];
        for entity in versions {
            keys.push(self.keys.id(entity.id().as_str()));
            // find_by_code falls back to the id column for uncoded entities
            keys.push(self.keys.code(entity.business_key()));
        }
        keys.sort();
        keys.dedup();

        let results = join_all(keys.iter().map(|key| self.cache.delete(key))).await;
        let mut failed = 0;
        for (key, result) in keys.iter().zip(results) {
            if let Err(err) = result {
                failed += 1;
                tracing::warn!(key = %key, error = %err, "Cache invalidation failed");
            }
        }

        if self.cache.supports_pattern_delete() {
            for predicate in E::CACHED_PREDICATES {
                let pattern = self.keys.predicate_pattern(predicate);
                if let Err(err) = self.cache.delete_pattern(&pattern).await {
                    failed += 1;
                    tracing::warn!(pattern = %pattern, error = %err, "Cache invalidation failed");
                }
            }
        } else {
            let tracked: Vec<String> = self
                .tracked_keys
                .iter()
                .map(|key| key.key().clone())
                .collect();
            for key in tracked {
                self.tracked_keys.remove(&key);
                if let Err(err) = self.cache.delete(&key).await {
                    failed += 1;
                    tracing::warn!(key = %key, error = %err, "Cache invalidation failed");
                    self.tracked_keys.insert(key);
                }
            }
        }

        if failed > 0 {
            tracing::warn!(failed, "Cache may serve stale entries until TTL expiry");
        }
    }

    async fn publish(&self, mut events: Vec<DomainEvent>, entity: &E, inserted: bool) {
        if events.is_empty() && inserted {
            events.push(DomainEvent::new(
                E::ENTITY_TYPE,
                entity.id().as_str(),
                format!("{}Created", E::ENTITY_TYPE),
                entity.creation_payload(),
            ));
        }

        for event in &events {
            match self.events.publish(event).await {
                Ok(()) => tracing::debug!(event_type = %event.event_type, "Event published"),
                Err(err) => tracing::warn!(
                    event_type = %event.event_type,
                    error = %err,
                    "Event publication failed"
                ),
            }
        }
    }

    async fn cache_read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => Some(value),
                Err(err) => {
                    self.evict_unreadable(key, &err.to_string()).await;
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Cache read failed, falling back to storage");
                None
            }
        }
    }

    async fn cache_write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Could not encode cache entry");
                return;
            }
        };
        if let Err(err) = self.cache.set(key, text, ttl).await {
            tracing::warn!(key = %key, error = %err, "Cache write failed");
        }
    }

    async fn evict_unreadable(&self, key: &str, reason: &str) {
        tracing::warn!(key = %key, reason, "Discarding unreadable cache entry");
        if let Err(err) = self.cache.delete(key).await {
            tracing::warn!(key = %key, error = %err, "Cache invalidation failed");
        }
    }

    fn require(&self, op: RepositoryOperation, name: &str, value: &str) -> RepositoryResult<()> {
        if value.trim().is_empty() {
            return Err(
                RepositoryError::validation_failed(op, format!("{} is required", name))
                    .with_entity_type(E::ENTITY_TYPE),
            );
        }
        Ok(())
    }

    fn storage_error(
        &self,
        op: RepositoryOperation,
        err: StorageError,
        key: &str,
    ) -> RepositoryError {
        let error = RepositoryError::from_storage(op, err).with_entity(E::ENTITY_TYPE, key);
        tracing::error!(operation = %op, key = %key, error = %error, "Storage call failed");
        error
    }

    fn mapping_error(&self, op: RepositoryOperation, err: RowMapError, key: &str) -> RepositoryError {
        RepositoryError::serialization_error(op, err.message).with_entity(E::ENTITY_TYPE, key)
    }
}

impl<E: Entity, M: RowMapper<E>> EntityStore<E> for EntityRepository<E, M> {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, DomainError> {
        EntityRepository::find_by_id(self, id).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<E>, DomainError> {
        EntityRepository::find_by_code(self, code).await
    }

    async fn find_all(&self) -> Result<Vec<E>, DomainError> {
        EntityRepository::find_all(self).await
    }

    async fn save(&self, entity: &mut E) -> Result<E, DomainError> {
        EntityRepository::save(self, entity).await
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        EntityRepository::delete(self, key).await
    }

    async fn seed(&self, records: Value) -> Result<SeedReport, DomainError> {
        EntityRepository::seed(self, records).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    use super::*;
    use crate::cache::{CacheBackend, CacheError, CacheResult, CachePolicy, MemoryCache};
    use crate::domain::{
        Challenge, ChallengeStatus, ConfigEntity, DetailsUpdate, FocusArea, NewChallenge,
    };
    use crate::events::{DomainEvent, EventBus, EventBusError, InMemoryEventBus};
    use crate::repository::{DomainErrorKind, RepositoryErrorKind};
    use crate::storage::{MemoryStorage, StorageError, StorageOp};

    struct Fixture<E: Entity> {
        storage: MemoryStorage,
        cache: MemoryCache,
        bus: InMemoryEventBus,
        repo: EntityRepository<E>,
    }

    fn fixture<E: Entity>(cache: MemoryCache) -> Fixture<E> {
        let storage = MemoryStorage::new().with_unique("focus_areas", "code");
        let bus = InMemoryEventBus::new();
        let repo = EntityRepository::<E>::new(Arc::new(storage.clone()))
            .with_cache(Arc::new(cache.clone()), CachePolicy::default())
            .with_events(Arc::new(bus.clone()));
        Fixture {
            storage,
            cache,
            bus,
            repo,
        }
    }

    fn new_challenge(email: &str) -> Challenge {
        Challenge::create(NewChallenge {
            title: "Trace the deadlock".into(),
            user_email: email.into(),
            focus_area: "concurrency".into(),
            challenge_type: "debugging".into(),
            format_type: "code".into(),
            difficulty: "hard".into(),
            content: json!({"prompt": "Two mutexes, one order"}),
        })
        .unwrap()
    }

    /// Records every publish attempt and rejects it
    #[derive(Default)]
    struct FailingEventBus {
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventBus for FailingEventBus {
        async fn publish(&self, event: &DomainEvent) -> Result<(), EventBusError> {
            self.attempts.lock().unwrap().push(event.event_type.clone());
            Err(EventBusError::Publish {
                event_type: event.event_type.clone(),
                message: "broker unreachable".into(),
            })
        }
    }

    struct FailingCache;

    #[async_trait]
    impl CacheBackend for FailingCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
            Err(CacheError::Unavailable("connection refused".into()))
        }

        fn supports_pattern_delete(&self) -> bool {
            true
        }
    }

    /// Cache without pattern delete whose first `set` under `prefix` waits for `release`
    struct GatedCache {
        inner: MemoryCache,
        prefix: &'static str,
        armed: AtomicBool,
        reached: Notify,
        release: Notify,
    }

    impl GatedCache {
        fn new(prefix: &'static str) -> Self {
            Self {
                inner: MemoryCache::without_pattern_delete(),
                prefix,
                armed: AtomicBool::new(true),
                reached: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl CacheBackend for GatedCache {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
            if key.starts_with(self.prefix) && self.armed.swap(false, Ordering::SeqCst) {
                self.reached.notify_one();
                self.release.notified().await;
            }
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> CacheResult<()> {
            self.inner.delete(key).await
        }

        async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
            self.inner.delete_pattern(pattern).await
        }

        fn supports_pattern_delete(&self) -> bool {
            false
        }
    }

    /// Maps through serde but upper-cases names on the way out
    #[derive(Clone, Copy)]
    struct ShoutingMapper;

    impl RowMapper<FocusArea> for ShoutingMapper {
        fn to_domain(&self, row: Row) -> Result<FocusArea, RowMapError> {
            let mut area: FocusArea = SerdeMapper.to_domain(row)?;
            area.attributes.name = area.attributes.name.to_uppercase();
            Ok(area)
        }

        fn to_persistence(&self, entity: &FocusArea) -> Result<Row, RowMapError> {
            SerdeMapper.to_persistence(entity)
        }
    }

    #[tokio::test]
    async fn test_save_then_find_round_trip() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        let mut area = FocusArea::new("fa1", "Fundamentals").with_related_areas(vec!["fa2".into()]);

        let saved = f.repo.save(&mut area).await.unwrap();
        assert_eq!(saved.id, area.id);
        assert!(saved.attributes.created_at.is_some());

        let found = f.repo.find_by_code("fa1").await.unwrap().unwrap();
        assert_eq!(found.id, area.id);
        assert_eq!(found.attributes.name, "Fundamentals");
        assert_eq!(found.related_areas, vec!["fa2"]);

        let by_id = f.repo.find_by_id(area.id.as_str()).await.unwrap().unwrap();
        assert_eq!(by_id.attributes.code, "fa1");
    }

    #[tokio::test]
    async fn test_insert_invalidates_collection_and_publishes_created() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        assert!(f.repo.find_all().await.unwrap().is_empty());
        assert!(f.cache.contains("focusArea:all"));

        let mut area = FocusArea::new("fa1", "Fundamentals");
        f.repo.save(&mut area).await.unwrap();

        assert!(!f.cache.contains("focusArea:all"));
        let events = f.bus.published();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "FocusAreaCreated");
        assert_eq!(events[0].payload["code"], "fa1");
        assert_eq!(events[0].entity_id, area.id.as_str());
    }

    #[tokio::test]
    async fn test_update_publishes_raised_events_only() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        let mut area = FocusArea::new("fa1", "Fundamentals");
        f.repo.save(&mut area).await.unwrap();
        f.bus.clear();

        let mut loaded = f.repo.find_by_code("fa1").await.unwrap().unwrap();
        loaded.deactivate();
        loaded.update_details(DetailsUpdate {
            sort_order: Some(4),
            ..Default::default()
        });
        f.repo.save(&mut loaded).await.unwrap();

        assert_eq!(
            f.bus.event_types(),
            vec!["FocusAreaDeactivated", "FocusAreaUpdated"]
        );
        assert!(loaded.pending_events().is_empty());

        // unchanged save: nothing to publish
        f.repo.save(&mut loaded).await.unwrap();
        assert_eq!(f.bus.published().len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_stored_identity() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        let mut original = FocusArea::new("fa1", "Fundamentals");
        let first = f.repo.save(&mut original).await.unwrap();

        let mut replacement = FocusArea::new("fa1", "Foundations");
        assert_ne!(replacement.id, original.id);
        let second = f.repo.save(&mut replacement).await.unwrap();

        assert_eq!(second.id, original.id);
        assert_eq!(second.attributes.created_at, first.attributes.created_at);
        assert_eq!(second.attributes.name, "Foundations");
        assert_eq!(f.storage.rows("focus_areas").len(), 1);
        assert_eq!(f.storage.calls().insert, 1);
        assert_eq!(f.storage.calls().update, 1);
    }

    #[tokio::test]
    async fn test_events_cleared_even_when_save_fails() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        f.storage
            .fail(StorageOp::Insert, StorageError::query_failed("disk full"));

        let mut area = FocusArea::new("fa1", "Fundamentals");
        area.deactivate();
        assert_eq!(area.pending_events().len(), 1);

        let err = f.repo.save(&mut area).await.unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::Database);
        assert_eq!(err.name(), "FocusAreaDatabaseError");
        assert!(area.pending_events().is_empty());
        assert!(f.bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_transition_never_reaches_storage() {
        let f = fixture::<Challenge>(MemoryCache::new());
        let mut challenge = new_challenge("learner@example.com");
        challenge.activate().unwrap();
        challenge.submit_response("Acquire locks in one order").unwrap();
        f.repo.save(&mut challenge).await.unwrap();

        let mut loaded = f
            .repo
            .find_by_id(challenge.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, ChallengeStatus::Completed);
        loaded.status = ChallengeStatus::Active;

        let updates_before = f.storage.calls().update;
        let err = f.repo.save(&mut loaded).await.unwrap_err();

        assert_eq!(err.kind(), DomainErrorKind::InvalidStatusTransition);
        assert_eq!(err.name(), "ChallengeInvalidStatusTransitionError");
        assert_eq!(err.status_hint(), 422);
        let change = err.status_change().unwrap();
        assert_eq!((change.from.as_str(), change.to.as_str()), ("completed", "active"));
        assert_eq!(f.storage.calls().update, updates_before);
    }

    #[tokio::test]
    async fn test_challenge_lifecycle_events_published_in_order() {
        let f = fixture::<Challenge>(MemoryCache::new());
        let mut challenge = new_challenge("learner@example.com");
        challenge.activate().unwrap();
        f.repo.save(&mut challenge).await.unwrap();

        challenge.submit_response("answer").unwrap();
        challenge.evaluate(90, "Clear").unwrap();
        let saved = f.repo.save(&mut challenge).await.unwrap();

        assert_eq!(
            f.bus.event_types(),
            vec![
                "ChallengeCreated",
                "ChallengeActivated",
                "ChallengeCompleted",
                "ChallengeEvaluated"
            ]
        );
        assert_eq!(saved.status, ChallengeStatus::Completed);
        assert_eq!(saved.evaluation.map(|e| e.score), Some(90));
    }

    #[tokio::test]
    async fn test_find_all_not_stale_after_save_and_delete() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        f.repo
            .save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();
        assert_eq!(f.repo.find_all().await.unwrap().len(), 1);

        f.repo
            .save(&mut FocusArea::new("fa2", "Testing"))
            .await
            .unwrap();
        let codes: Vec<String> = f
            .repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.attributes.code)
            .collect();
        assert_eq!(codes, vec!["fa1", "fa2"]);

        assert!(f.repo.delete("fa1").await.unwrap());
        let remaining = f.repo.find_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].attributes.code, "fa2");
        assert!(f.repo.find_by_code("fa1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_entities_are_hidden_but_still_upserted() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        let mut area = FocusArea::new("fa1", "Fundamentals");
        area.deactivate();
        f.repo.save(&mut area).await.unwrap();

        assert!(f.repo.find_by_code("fa1").await.unwrap().is_none());
        assert!(f.repo.find_all().await.unwrap().is_empty());

        // the existence check ignores the active filter, so this is an update
        let mut again = FocusArea::new("fa1", "Fundamentals");
        f.repo.save(&mut again).await.unwrap();
        assert_eq!(f.storage.calls().insert, 1);
        assert!(f.repo.find_by_code("fa1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_seed_collects_failures() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        let report = f
            .repo
            .seed(json!([
                {"code": "fa1", "name": "Fundamentals"},
                {"code": "fa2"},
                {"code": "fa3", "name": "Loops", "prerequisites": ["fa3"]},
                {"code": "fa4", "name": "Testing", "sort_order": 1}
            ]))
            .await
            .unwrap();

        assert_eq!(report.attempted, 4);
        assert_eq!(report.saved, 2);
        assert_eq!(report.failed(), 2);
        assert!(!report.is_complete());

        let failed: Vec<(usize, Option<&str>)> = report
            .failures
            .iter()
            .map(|failure| (failure.index, failure.code.as_deref()))
            .collect();
        assert_eq!(failed, vec![(1, Some("fa2")), (2, Some("fa3"))]);
        assert!(report
            .failures
            .iter()
            .all(|failure| failure.error.kind() == DomainErrorKind::Validation));

        assert_eq!(f.repo.find_all().await.unwrap().len(), 2);
        assert_eq!(
            f.bus.event_types(),
            vec!["FocusAreaCreated", "FocusAreaCreated"]
        );
    }

    #[tokio::test]
    async fn test_seed_rejects_non_array_and_empty_input() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        for input in [json!({"code": "fa1"}), json!([]), json!(null)] {
            let err = f.repo.seed(input).await.unwrap_err();
            assert_eq!(err.kind(), DomainErrorKind::Validation);
        }
        assert_eq!(f.storage.calls(), Default::default());
    }

    #[tokio::test]
    async fn test_missing_code_is_none_and_not_cached() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        assert!(f.repo.find_by_code("missing").await.unwrap().is_none());
        assert!(!f.cache.contains("focusArea:code:missing"));
        assert!(f.repo.find_by_id("focus_area_nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_returns_false_without_storage_delete() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        assert!(!f.repo.delete("fa1").await.unwrap());
        assert_eq!(f.storage.calls().delete, 0);
        assert_eq!(f.storage.calls().select, 1);
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_duplicate_with_code() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        // another writer inserted the same code between lookup and insert
        f.storage.fail(
            StorageOp::Insert,
            StorageError::unique_violation("focus_areas_code_key", Some("fa1".into())),
        );

        let err = f
            .repo
            .save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::Duplicate);
        assert_eq!(err.name(), "FocusAreaDuplicateError");
        assert_eq!(err.entity_id(), Some("fa1"));
        assert_eq!(err.status_hint(), 409);
        assert_eq!(
            err.repository_error().metadata.get("constraint").map(String::as_str),
            Some("focus_areas_code_key")
        );
        assert!(f.bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_validation_failures_make_no_storage_calls() {
        let f = fixture::<FocusArea>(MemoryCache::new());

        let err = f
            .repo
            .save(&mut FocusArea::new("fa1", " "))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::Validation);
        assert_eq!(err.status_hint(), 400);

        for err in [
            f.repo.find_by_code("").await.unwrap_err(),
            f.repo.find_by_id("  ").await.unwrap_err(),
            f.repo.delete("").await.unwrap_err(),
            f.repo.find_by_prerequisite("").await.unwrap_err(),
        ] {
            assert_eq!(err.kind(), DomainErrorKind::Validation);
            assert_eq!(err.name(), "FocusAreaValidationError");
        }

        assert_eq!(f.storage.calls(), Default::default());
    }

    #[tokio::test]
    async fn test_cached_reads_skip_storage() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        f.repo
            .save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();

        let before = f.storage.calls().select;
        f.repo.find_by_code("fa1").await.unwrap();
        f.repo.find_by_code("fa1").await.unwrap();
        f.repo.find_all().await.unwrap();
        f.repo.find_all().await.unwrap();
        assert_eq!(f.storage.calls().select, before + 2);
        assert!(f.cache.contains("focusArea:code:fa1"));
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_falls_back_to_storage() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        f.repo
            .save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();
        f.cache
            .set("focusArea:code:fa1", "{not json".into(), Duration::from_secs(60))
            .await
            .unwrap();

        let found = f.repo.find_by_code("fa1").await.unwrap().unwrap();
        assert_eq!(found.attributes.code, "fa1");

        // replaced with a readable entry
        let cached = f.cache.get("focusArea:code:fa1").await.unwrap().unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&cached).is_ok());
    }

    #[tokio::test]
    async fn test_predicate_keys_evicted_without_pattern_delete() {
        let f = fixture::<FocusArea>(MemoryCache::without_pattern_delete());
        assert!(f.repo.find_by_prerequisite("fa0").await.unwrap().is_empty());
        assert!(f.cache.contains("focusArea:prerequisite:fa0"));

        let mut area = FocusArea::new("fa1", "Fundamentals").with_prerequisites(vec!["fa0".into()]);
        f.repo.save(&mut area).await.unwrap();
        assert!(!f.cache.contains("focusArea:prerequisite:fa0"));

        let dependents = f.repo.find_by_prerequisite("fa0").await.unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].attributes.code, "fa1");
    }

    #[tokio::test]
    async fn test_predicate_keys_evicted_by_pattern() {
        let f = fixture::<Challenge>(MemoryCache::new());
        let statuses = [ChallengeStatus::Active, ChallengeStatus::Draft];
        assert!(f.repo.find_by_statuses(&statuses).await.unwrap().is_empty());
        assert!(f.repo.find_by_user_email("a@example.com").await.unwrap().is_empty());
        assert!(f.cache.contains("challenge:statuses:active,draft"));
        assert!(f.cache.contains("challenge:userEmail:a@example.com"));

        f.repo
            .save(&mut new_challenge("a@example.com"))
            .await
            .unwrap();
        assert!(f.cache.is_empty());

        // argument order does not change the key
        let reversed = [ChallengeStatus::Draft, ChallengeStatus::Active];
        assert_eq!(f.repo.find_by_statuses(&reversed).await.unwrap().len(), 1);
        assert!(f.cache.contains("challenge:statuses:active,draft"));
        assert_eq!(
            f.repo
                .find_by_user_email("a@example.com")
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_challenge_finders_exclude_deleted() {
        let f = fixture::<Challenge>(MemoryCache::new());
        let mut kept = new_challenge("a@example.com");
        let mut dropped = new_challenge("a@example.com");
        f.repo.save(&mut kept).await.unwrap();
        f.repo.save(&mut dropped).await.unwrap();

        dropped.mark_deleted().unwrap();
        f.repo.save(&mut dropped).await.unwrap();

        let mine = f.repo.find_by_user_email("a@example.com").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, kept.id);
        assert!(f
            .repo
            .find_by_id(dropped.id.as_str())
            .await
            .unwrap()
            .is_none());
        assert!(f
            .repo
            .find_by_status(ChallengeStatus::Deleted)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(f.repo.find_by_focus_area("concurrency").await.unwrap().len(), 1);

        // hard delete by id
        assert!(f.repo.delete(dropped.id.as_str()).await.unwrap());
        assert!(f.storage.rows("challenges").len() == 1);
    }

    #[tokio::test]
    async fn test_find_by_code_falls_back_to_id_for_uncoded_entities() {
        let f = fixture::<Challenge>(MemoryCache::new());
        let mut challenge = new_challenge("a@example.com");
        f.repo.save(&mut challenge).await.unwrap();

        let found = f.repo.find_by_code(challenge.id.as_str()).await.unwrap();
        assert!(found.is_some());

        challenge.activate().unwrap();
        f.repo.save(&mut challenge).await.unwrap();
        let found = f
            .repo
            .find_by_code(challenge.id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, ChallengeStatus::Active);
    }

    #[tokio::test]
    async fn test_concurrent_saves_last_write_wins() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        f.repo
            .save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();

        let mut first = f.repo.find_by_code("fa1").await.unwrap().unwrap();
        let mut second = first.clone();
        first.update_details(DetailsUpdate {
            name: Some("First".into()),
            ..Default::default()
        });
        second.update_details(DetailsUpdate {
            name: Some("Second".into()),
            ..Default::default()
        });

        let (repo_a, repo_b) = (f.repo.clone(), f.repo.clone());
        let (a, b) = tokio::join!(
            tokio::spawn(async move { repo_a.save(&mut first).await }),
            tokio::spawn(async move { repo_b.save(&mut second).await }),
        );
        let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());
        assert_eq!(a.id, b.id);

        // no version check: both succeed and one of them is what remains
        assert_eq!(f.storage.rows("focus_areas").len(), 1);
        let stored = f.repo.find_by_code("fa1").await.unwrap().unwrap();
        assert!(["First", "Second"].contains(&stored.attributes.name.as_str()));
    }

    #[tokio::test]
    async fn test_publish_failures_do_not_fail_the_save() {
        let storage = MemoryStorage::new();
        let bus = Arc::new(FailingEventBus::default());
        let repo = EntityRepository::<Challenge>::new(Arc::new(storage.clone())).with_events(bus.clone());

        let mut challenge = new_challenge("a@example.com");
        challenge.activate().unwrap();
        repo.save(&mut challenge).await.unwrap();

        assert_eq!(
            *bus.attempts.lock().unwrap(),
            vec!["ChallengeCreated", "ChallengeActivated"]
        );
        assert!(challenge.pending_events().is_empty());
        assert_eq!(storage.rows("challenges").len(), 1);
    }

    #[tokio::test]
    async fn test_cache_outage_falls_back_to_storage() {
        let storage = MemoryStorage::new();
        let repo = EntityRepository::<FocusArea>::new(Arc::new(storage.clone()))
            .with_cache(Arc::new(FailingCache), CachePolicy::default());

        repo.save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();
        assert!(repo.find_by_code("fa1").await.unwrap().is_some());
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
        assert!(repo.delete("fa1").await.unwrap());
    }

    #[tokio::test]
    async fn test_storage_outage_is_retriable_database_error() {
        let f = fixture::<FocusArea>(MemoryCache::new());
        f.storage
            .fail(StorageOp::Select, StorageError::connection_failed("refused"));

        let err = f.repo.find_all().await.unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::Database);
        assert!(err.is_retriable());
        assert_eq!(err.status_hint(), 503);

        f.storage.clear_failures();
        assert!(f.repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_error_mapping() {
        let storage = MemoryStorage::new();
        let repo = EntityRepository::<FocusArea>::new(Arc::new(storage)).with_error_mapping(
            ErrorMapping::standard("FocusArea")
                .rule(RepositoryErrorKind::ValidationFailed, DomainErrorKind::Processing),
        );

        let err = repo.find_by_code("").await.unwrap_err();
        assert_eq!(err.kind(), DomainErrorKind::Processing);
        assert_eq!(err.name(), "FocusAreaProcessingError");
        assert_eq!(err.repository_error().generic_name(), "ValidationError");
    }

    #[tokio::test]
    async fn test_usable_through_entity_store() {
        async fn count<S: EntityStore<FocusArea>>(store: &S) -> usize {
            store.find_all().await.map(|all| all.len()).unwrap_or(0)
        }

        let f = fixture::<FocusArea>(MemoryCache::new());
        EntityStore::save(&f.repo, &mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();
        assert_eq!(count(&f.repo).await, 1);
    }

    #[tokio::test]
    async fn test_predicate_read_racing_a_write_stays_evictable() {
        let cache = Arc::new(GatedCache::new("focusArea:prerequisite:"));
        let storage = MemoryStorage::new();
        let repo = EntityRepository::<FocusArea>::new(Arc::new(storage.clone()))
            .with_cache(cache.clone(), CachePolicy::default());

        // the read has loaded zero rows and is about to store them
        let reader = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.find_by_prerequisite("fa0").await })
        };
        cache.reached.notified().await;

        let mut fa1 = FocusArea::new("fa1", "Fundamentals").with_prerequisites(vec!["fa0".into()]);
        repo.save(&mut fa1).await.unwrap();
        cache.release.notify_one();
        assert!(reader.await.unwrap().unwrap().is_empty());

        let mut fa2 = FocusArea::new("fa2", "Testing").with_prerequisites(vec!["fa0".into()]);
        repo.save(&mut fa2).await.unwrap();

        assert_eq!(storage.rows("focus_areas").len(), 2);
        assert_eq!(repo.find_by_prerequisite("fa0").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_custom_row_mapper() {
        let storage = MemoryStorage::new();
        let repo = EntityRepository::<FocusArea>::new(Arc::new(storage.clone()))
            .with_cache(Arc::new(MemoryCache::new()), CachePolicy::default())
            .with_mapper(ShoutingMapper);

        let saved = repo
            .save(&mut FocusArea::new("fa1", "Fundamentals"))
            .await
            .unwrap();
        assert_eq!(saved.attributes.name, "FUNDAMENTALS");
        assert_eq!(storage.rows("focus_areas")[0]["name"], json!("Fundamentals"));

        // cached rows go through the mapper too
        repo.find_by_code("fa1").await.unwrap();
        let cached = repo.find_by_code("fa1").await.unwrap().unwrap();
        assert_eq!(cached.attributes.name, "FUNDAMENTALS");
    }
}
