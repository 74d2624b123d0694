//! Redis-backed counters for verification code attempts

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    services::attempts::AttemptStore,
};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl AttemptStore for RedisService {
    async fn attempts(&self, key: &str) -> AppResult<u32> {
        let mut conn = self.connection().await?;
        let count: Option<u32> = conn
            .get(key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read attempt counter from Redis: {}", e)))?;
        Ok(count.unwrap_or(0))
    }

    async fn record_attempt(&self, key: &str, window_secs: u64) -> AppResult<u32> {
        let window = i64::try_from(window_secs)
            .map_err(|_| AppError::Internal(format!("Attempt window out of range: {}s", window_secs)))?;
        let mut conn = self.connection().await?;

        // SET NX opens the window only for the first attempt; INCR keeps the TTL
        let (count,): (u32,) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("EX")
            .arg(window)
            .arg("NX")
            .ignore()
            .incr(key, 1)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to count attempt in Redis: {}", e)))?;

        Ok(count)
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to clear attempt counter in Redis: {}", e)))?;
        Ok(())
    }
}
