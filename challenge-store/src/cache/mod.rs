//! Read-aside cache port
//!
//! Repositories read through a [`CacheBackend`] before touching storage and
//! evict affected keys after every write. A repository built without a cache
//! gets [`NoopCache`], which always misses, so read and write paths never
//! branch on whether caching is configured.
//!
//! Values are JSON text. Keys are namespaced per entity type, see [`CacheKeys`].

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CacheConfig;

#[cfg(feature = "cache")]
mod redis;

#[cfg(feature = "cache")]
pub use self::redis::{create_pool, RedisCache};

/// Result type for cache calls
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache backend failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A cached value could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// The backend cannot evict by pattern
    #[error("Pattern deletion not supported by this cache backend")]
    PatternUnsupported,
}

/// Key/value cache with per-entry TTL
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read a value; `None` on miss or expiry
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Delete every key matching a glob (`*` and `?` wildcards); returns the count removed
    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64>;

    /// Whether [`CacheBackend::delete_pattern`] is implemented
    fn supports_pattern_delete(&self) -> bool;
}

/// Cache that stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheBackend for NoopCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        Ok(0)
    }

    fn supports_pattern_delete(&self) -> bool {
        true
    }
}

/// In-process cache backed by `DashMap`
///
/// Entries expire lazily: an expired entry is dropped when it is next read.
/// Pattern deletion can be switched off to exercise the per-key eviction path.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, (String, Instant)>>,
    pattern_delete: bool,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            pattern_delete: true,
        }
    }

    /// A cache that reports no pattern-delete capability
    pub fn without_pattern_delete() -> Self {
        Self {
            pattern_delete: false,
            ..Self::new()
        }
    }

    /// Whether a live entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.1 > Instant::now())
    }

    /// Keys of all live entries, sorted
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().1 > now)
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .map(|entry| (entry.0.clone(), entry.1 > now));

        match hit {
            Some((value, true)) => Ok(Some(value)),
            Some((_, false)) => {
                self.entries.remove_if(key, |_, entry| entry.1 <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        if !self.pattern_delete {
            return Err(CacheError::PatternUnsupported);
        }

        let matcher = glob_to_regex(pattern)?;
        let before = self.entries.len();
        self.entries.retain(|key, _| !matcher.is_match(key));
        Ok((before - self.entries.len()) as u64)
    }

    fn supports_pattern_delete(&self) -> bool {
        self.pattern_delete
    }
}

/// Compile a Redis-style glob (`*`, `?`) into an anchored regex
pub(crate) fn glob_to_regex(pattern: &str) -> CacheResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| CacheError::Unavailable(format!("invalid pattern: {}", e)))
}

/// Builds the namespaced keys for one entity type
///
/// ```rust
/// use challenge_store::cache::CacheKeys;
///
/// let keys = CacheKeys::new("focusArea");
/// assert_eq!(keys.all(), "focusArea:all");
/// assert_eq!(keys.code("fa1"), "focusArea:code:fa1");
/// assert_eq!(keys.predicate_set("status", &["completed", "active"]), "focusArea:status:active,completed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    namespace: String,
}

impl CacheKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn all(&self) -> String {
        format!("{}:all", self.namespace)
    }

    pub fn code(&self, code: &str) -> String {
        format!("{}:code:{}", self.namespace, code)
    }

    pub fn id(&self, id: &str) -> String {
        format!("{}:id:{}", self.namespace, id)
    }

    pub fn predicate(&self, predicate: &str, value: &str) -> String {
        format!("{}:{}:{}", self.namespace, predicate, value)
    }

    /// Key for a set-valued argument; order of `values` does not matter
    pub fn predicate_set<S: AsRef<str>>(&self, predicate: &str, values: &[S]) -> String {
        let mut values: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
        values.sort_unstable();
        values.dedup();
        self.predicate(predicate, &values.join(","))
    }

    /// Glob matching every key of one predicate
    pub fn predicate_pattern(&self, predicate: &str) -> String {
        format!("{}:{}:*", self.namespace, predicate)
    }
}

/// TTLs chosen by the cardinality of the cached result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub entity_ttl: Duration,
    pub collection_ttl: Duration,
    pub query_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            entity_ttl: config.entity_ttl(),
            collection_ttl: config.collection_ttl(),
            query_ttl: config.query_ttl(),
        }
    }
}
