//! In-app feed delivery: bounded Redis lists the app reads from.

use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use serde::Serialize;
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::RenderedPayload;

#[derive(Debug, Serialize)]
struct FeedEntry<'a> {
    id: Uuid,
    #[serde(flatten)]
    payload: &'a RenderedPayload,
    created_at: DateTime<Utc>,
}

pub struct InAppSender {
    redis: ConnectionManager,
    max_len: usize,
}

impl InAppSender {
    pub fn new(redis: ConnectionManager, max_len: usize) -> Self {
        Self {
            redis,
            max_len: max_len.max(1),
        }
    }

    /// Redis key of a feed; personal feeds are keyed by user id, announcement
    /// feeds by `announcements:{language}`.
    pub fn feed_key(destination: &str) -> String {
        format!("inapp:{destination}")
    }

    pub async fn send(&self, destination: &str, payload: &RenderedPayload) -> Result<(), AppError> {
        let entry = FeedEntry {
            id: Uuid::new_v4(),
            payload,
            created_at: Utc::now(),
        };
        let encoded = serde_json::to_string(&entry)?;
        let key = Self::feed_key(destination);

        let mut conn = self.redis.clone();
        redis::pipe()
            .atomic()
            .lpush(&key, encoded)
            .ignore()
            .ltrim(&key, 0, self.max_len as isize - 1)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        tracing::debug!(feed = %key, "In-app entry appended");
        Ok(())
    }
}
