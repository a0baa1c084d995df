//! Redis-list event bus.
//!
//! Producers `LPUSH` JSON-encoded events onto a queue and the consumer pops
//! them from the other end in batches. Delivery guarantees beyond what a Redis
//! list offers are not attempted here.

use std::num::NonZeroUsize;

use redis::AsyncCommands;
use redis::Client;
use redis::aio::ConnectionManager;

use crate::error::AppError;
use crate::types::Event;

/// Number of synthetic health messages kept on the health queue.
const HEALTH_QUEUE_RETAINED: isize = 10;

/// Thin producer/consumer handle over a Redis connection manager.
#[derive(Clone)]
pub struct EventBus {
    redis: ConnectionManager,
}

impl EventBus {
    /// Connect to Redis. Failing here aborts startup.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        tracing::info!("Connected to Redis");
        Ok(Self { redis: manager })
    }

    /// Shared connection, used by the in-app feed sender.
    pub fn connection(&self) -> ConnectionManager {
        self.redis.clone()
    }

    /// Publish an event onto a queue.
    pub async fn publish(&self, queue: &str, event: &Event) -> Result<(), AppError> {
        let encoded = serde_json::to_string(event)?;
        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(queue, encoded).await?;
        Ok(())
    }

    /// Pop up to `max` raw messages, oldest first. Returns an empty vec when the queue is empty.
    pub async fn pop_batch(&self, queue: &str, max: usize) -> Result<Vec<String>, AppError> {
        let Some(count) = NonZeroUsize::new(max) else {
            return Ok(Vec::new());
        };
        let mut conn = self.redis.clone();
        let messages: Option<Vec<String>> = conn.rpop(queue, Some(count)).await?;
        Ok(messages.unwrap_or_default())
    }

    /// Push a synthetic message through the producer path and wait for Redis to acknowledge it.
    ///
    /// Returns the queue length reported by Redis.
    pub async fn round_trip(&self, queue: &str, message: &str) -> Result<usize, AppError> {
        let mut conn = self.redis.clone();
        let length: usize = conn.lpush(queue, message).await?;
        if length == 0 {
            return Err(AppError::Internal(format!(
                "broker did not acknowledge message on {queue}"
            )));
        }
        conn.ltrim::<_, ()>(queue, 0, HEALTH_QUEUE_RETAINED - 1)
            .await?;
        Ok(length)
    }
}
