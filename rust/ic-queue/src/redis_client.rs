//! Thin async Redis wrapper shared by C7 (worker config), C6/C8 (queue +
//! heartbeat). Grounded on the `ConnectionManager`-based client pattern
//! used across the retrieved example pack (auto-reconnect, JSON-serialized
//! values, explicit TTLs) — `RedisClient` is `Clone + Send + Sync` and
//! cheap to clone since cloning a `ConnectionManager` just clones its
//! internal handle.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> redis::RedisResult<Self> {
        info!(url, "connecting to redis");
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn set_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> redis::RedisResult<()> {
        let serialized = serde_json::to_string(value)
            .map_err(|e| redis::RedisError::from((redis::ErrorKind::TypeError, "serialize", e.to_string())))?;
        let mut conn = self.conn.clone();
        match ttl {
            Some(d) => conn.set_ex::<_, _, ()>(key, serialized, d.as_secs()).await,
            None => conn.set::<_, _, ()>(key, serialized).await,
        }
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> redis::RedisResult<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(s) => {
                let value = serde_json::from_str(&s).map_err(|e| {
                    redis::RedisError::from((redis::ErrorKind::TypeError, "deserialize", e.to_string()))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn del(&self, key: &str) -> redis::RedisResult<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    pub async fn exists(&self, key: &str) -> redis::RedisResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key).await
    }

    /// `SET key value NX EX ttl`. Returns `true` if the key was set (i.e.
    /// it was absent), `false` if it already existed.
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> redis::RedisResult<bool> {
        let mut conn = self.conn.clone();
        let opts = redis::SetOptions::default()
            .conditional_set(redis::ExistenceCheck::NX)
            .with_expiration(redis::SetExpiry::EX(ttl.as_secs() as usize));
        let result: Option<String> = conn.set_options(key, value, opts).await?;
        Ok(result.is_some())
    }

    pub async fn rpush_json<T: serde::Serialize>(&self, key: &str, value: &T) -> redis::RedisResult<()> {
        let serialized = serde_json::to_string(value)
            .map_err(|e| redis::RedisError::from((redis::ErrorKind::TypeError, "serialize", e.to_string())))?;
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(key, serialized).await
    }

    pub async fn lpop_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> redis::RedisResult<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.lpop(key, None).await?;
        match raw {
            Some(s) => {
                let value = serde_json::from_str(&s).map_err(|e| {
                    redis::RedisError::from((redis::ErrorKind::TypeError, "deserialize", e.to_string()))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn ping(&self) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient").finish_non_exhaustive()
    }
}
