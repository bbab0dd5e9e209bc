use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

pub const DEFAULT_CACHE_KEY: &str = "mvc_realid_message";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Cache connection already closed")]
    Closed,
}

/// Key-value store holding the last message that was sent.
#[async_trait]
pub trait MessageCache: Send {
    async fn get(&mut self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Releases the underlying connection. Called once at the end of a run.
    async fn close(&mut self);
}

/// Redis-backed cache. The connection is opened on the first `get` or `set`,
/// so building one does no I/O.
pub struct RedisCache {
    client: redis::Client,
    conn: Option<MultiplexedConnection>,
    closed: bool,
}

impl RedisCache {
    /// Validates the URL only.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            conn: None,
            closed: false,
        })
    }

    async fn connection(&mut self) -> Result<&mut MultiplexedConnection, CacheError> {
        if self.closed {
            return Err(CacheError::Closed);
        }
        if self.conn.is_none() {
            let conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .inspect_err(|e| log::error!("Redis connection error: {e:?}"))?;
            log::debug!("Connected to redis");
            self.conn = Some(conn);
        }
        self.conn.as_mut().ok_or(CacheError::Closed)
    }
}

#[async_trait]
impl MessageCache for RedisCache {
    async fn get(&mut self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = self
            .connection()
            .await?
            .get(key)
            .await
            .inspect_err(|e| log::error!("Failed to get {key}: {e:?}"))?;
        Ok(value)
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        let _: () = self
            .connection()
            .await?
            .set(key, value)
            .await
            .inspect_err(|e| log::error!("Failed to set {key}: {e:?}"))?;
        Ok(())
    }

    async fn close(&mut self) {
        self.closed = true;
        if self.conn.take().is_some() {
            log::debug!("Redis connection closed");
        }
    }
}

/// Process-local cache for dry runs. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: HashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut cache = Self::new();
        cache.entries.insert(key.to_string(), value.to_string());
        cache
    }

    pub fn entry(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

#[async_trait]
impl MessageCache for MemoryCache {
    async fn get(&mut self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_get_set() {
        let mut cache = MemoryCache::new();
        assert_eq!(cache.get(DEFAULT_CACHE_KEY).await.unwrap(), None);

        cache.set(DEFAULT_CACHE_KEY, "hello").await.unwrap();
        assert_eq!(
            cache.get(DEFAULT_CACHE_KEY).await.unwrap().as_deref(),
            Some("hello")
        );

        cache.set(DEFAULT_CACHE_KEY, "").await.unwrap();
        assert_eq!(cache.entry(DEFAULT_CACHE_KEY), Some(""));
    }

    #[tokio::test]
    async fn test_redis_cache_connects_lazily() {
        // Nothing listens on port 1; building the cache must not touch the network.
        let mut cache = RedisCache::new("redis://127.0.0.1:1/").expect("URL should be accepted");

        cache.close().await;

        assert!(matches!(
            cache.get(DEFAULT_CACHE_KEY).await,
            Err(CacheError::Closed)
        ));
        assert!(matches!(
            cache.set(DEFAULT_CACHE_KEY, "hello").await,
            Err(CacheError::Closed)
        ));
    }

    #[test]
    fn test_redis_cache_rejects_bad_url() {
        assert!(matches!(
            RedisCache::new("not a redis url"),
            Err(CacheError::Redis(_))
        ));
    }
}
