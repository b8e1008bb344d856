use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
pub mod memory;

/// Hash holding content-hash -> short code for every created link.
const DEDUP_KEY: &str = "short:link";

fn mapping_key(short_code: &str) -> String {
    format!("short:short:{short_code}")
}

fn visits_key(short_code: &str) -> String {
    format!("short:stats:{short_code}")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[cfg(test)]
    #[error("store offline")]
    Offline,
}

/// Durable side of link resolution: the code -> URL mapping, the dedup
/// index and per-code visit counters. Every method is a single round trip.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Store a mapping with no expiry, overwriting any previous value.
    async fn put_mapping(&self, short_code: &str, long_url: &str) -> Result<(), StoreError>;

    async fn get_mapping(&self, short_code: &str) -> Result<Option<String>, StoreError>;

    async fn get_dedup(&self, url_hash: &str) -> Result<Option<String>, StoreError>;

    /// Register `short_code` for `url_hash` unless a code is already
    /// registered. Returns whichever code is registered afterwards.
    async fn claim_dedup(&self, url_hash: &str, short_code: &str) -> Result<String, StoreError>;

    async fn increment_visits(&self, short_code: &str) -> Result<(), StoreError>;

    /// Visits recorded for a code; 0 when it has never been visited.
    async fn get_visits(&self, short_code: &str) -> Result<u64, StoreError>;
}

/// `LinkStore` backed by a Redis server.
///
/// Uses a `ConnectionManager`, which multiplexes requests over one
/// connection and reconnects on its own; cloning it is cheap.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `redis_url` and fail fast if the server is unreachable.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl LinkStore for RedisStore {
    async fn put_mapping(&self, short_code: &str, long_url: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(mapping_key(short_code), long_url).await?;
        Ok(())
    }

    async fn get_mapping(&self, short_code: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let long_url: Option<String> = conn.get(mapping_key(short_code)).await?;
        Ok(long_url)
    }

    async fn get_dedup(&self, url_hash: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let short_code: Option<String> = conn.hget(DEDUP_KEY, url_hash).await?;
        Ok(short_code)
    }

    async fn claim_dedup(&self, url_hash: &str, short_code: &str) -> Result<String, StoreError> {
        let mut conn = self.conn.clone();
        let claimed: bool = conn.hset_nx(DEDUP_KEY, url_hash, short_code).await?;
        if claimed {
            return Ok(short_code.to_owned());
        }

        // Dedup fields are never removed, so the winner is still there.
        let existing: Option<String> = conn.hget(DEDUP_KEY, url_hash).await?;
        debug!(hash = %url_hash, "Dedup entry already claimed");
        Ok(existing.unwrap_or_else(|| short_code.to_owned()))
    }

    async fn increment_visits(&self, short_code: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.incr(visits_key(short_code), 1).await?;
        Ok(())
    }

    async fn get_visits(&self, short_code: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let visits: Option<u64> = conn.get(visits_key(short_code)).await?;
        Ok(visits.unwrap_or(0))
    }
}
