//! Redis service backing browser sessions

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    services::sessions::SessionStore,
};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service, checking the connection
    pub async fn new(url: &str) -> AppResult<Self> {
        let service = Self::lazy(url)?;

        let mut conn = service.get_connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(service)
    }

    /// Create the client without connecting; the first command opens the connection
    pub fn lazy(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;
        Ok(Self { client })
    }

    /// Get a Redis connection
    pub async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }
}

fn visits_key(session_id: &str) -> String {
    format!("session:{}:num_visits", session_id)
}

#[async_trait]
impl SessionStore for RedisService {
    async fn incr_visits(&self, session_id: &str, ttl_seconds: u64) -> AppResult<i64> {
        let mut conn = self.get_connection().await?;
        let key = visits_key(session_id);

        // INCR and EXPIRE together so a session never outlives its TTL
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, ttl_seconds as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to count visit in Redis: {}", e)))?;

        Ok(count)
    }

    async fn flush(&self, session_id: &str) -> AppResult<()> {
        let mut conn = self.get_connection().await?;
        let _: () = conn
            .del(visits_key(session_id))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete session from Redis: {}", e)))?;
        Ok(())
    }
}
