//! Redis cache backend

use async_trait::async_trait;
use deadpool_redis::{Config as DeadpoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

use super::{CacheBackend, CacheError, CacheResult};
use crate::config::RedisConfig;
use crate::error::{sanitize_url, Error, Result};

const SCAN_BATCH: usize = 200;

/// Create a Redis connection pool, retrying with exponential backoff
pub async fn create_pool(config: &RedisConfig) -> Result<Pool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        attempts = attempt + 1,
                        "Redis connection established after retry"
                    );
                } else {
                    tracing::info!(
                        max_connections = config.max_connections,
                        "Redis connection pool created"
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        attempts = config.max_retries + 1,
                        error = %e,
                        "Failed to connect to Redis"
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));
                tracing::warn!(attempt, error = %e, ?delay, "Redis connection attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_pool(config: &RedisConfig) -> Result<Pool> {
    let pool = DeadpoolConfig::from_url(&config.url)
        .builder()
        .map_err(|e| Error::Internal(format!("Failed to build Redis pool: {}", e)))?
        .max_size(config.max_connections)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create Redis pool: {}", e)))?;

    // Fail fast if the server is unreachable
    pool.get().await.map_err(|e| {
        Error::Internal(format!(
            "Failed to get Redis connection at '{}': {}",
            sanitize_url(&config.url),
            e
        ))
    })?;

    Ok(pool)
}

/// [`CacheBackend`] on a deadpool Redis pool
///
/// Every key is stored under the optional deployment prefix, so several
/// environments can share one Redis instance.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    key_prefix: Option<String>,
}

impl RedisCache {
    pub fn new(pool: Pool, key_prefix: Option<String>) -> Self {
        Self { pool, key_prefix }
    }

    fn key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn conn(&self) -> CacheResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get(self.key(key)).await.map_err(unavailable)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(self.key(key), value, ttl.as_secs().max(1))
            .await
            .map_err(unavailable)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(self.key(key)).await.map_err(unavailable)
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let mut conn = self.conn().await?;
        let pattern = self.key(pattern);
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;

            if !keys.is_empty() {
                let count: u64 = conn.del(&keys).await.map_err(unavailable)?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(pattern = %pattern, removed, "Evicted keys by pattern");
        Ok(removed)
    }

    fn supports_pattern_delete(&self) -> bool {
        true
    }
}
