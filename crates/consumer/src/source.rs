use async_trait::async_trait;

use herald_common::bus::EventBus;
use herald_common::error::AppError;

/// Where raw event messages come from.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Pop up to `max` raw messages. An empty vec means nothing is waiting.
    async fn pop_batch(&self, max: usize) -> Result<Vec<String>, AppError>;
}

/// Reads the event queue on the Redis bus.
pub struct RedisEventSource {
    bus: EventBus,
    queue: String,
}

impl RedisEventSource {
    pub fn new(bus: EventBus, queue: impl Into<String>) -> Self {
        Self {
            bus,
            queue: queue.into(),
        }
    }
}

#[async_trait]
impl EventSource for RedisEventSource {
    async fn pop_batch(&self, max: usize) -> Result<Vec<String>, AppError> {
        self.bus.pop_batch(&self.queue, max).await
    }
}
