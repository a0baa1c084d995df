//! Liveness probe: the ledger store must answer and the bus producer path must
//! acknowledge a synthetic message.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use crate::bus::EventBus;
use crate::db;
use crate::error::AppError;

/// Upper bound for one probe.
pub const HEALTH_CHECK_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct HealthProbe {
    pool: PgPool,
    bus: EventBus,
    queue: String,
}

impl HealthProbe {
    pub fn new(pool: PgPool, bus: EventBus, queue: impl Into<String>) -> Self {
        Self {
            pool,
            bus,
            queue: queue.into(),
        }
    }

    /// Run both checks under [`HEALTH_CHECK_DEADLINE`].
    pub async fn check(&self) -> Result<(), AppError> {
        tokio::time::timeout(HEALTH_CHECK_DEADLINE, self.check_inner())
            .await
            .map_err(|_| AppError::DeadlineExceeded("[health-check] probe timed out".to_string()))?
    }

    async fn check_inner(&self) -> Result<(), AppError> {
        db::ping(&self.pool).await.map_err(|e| {
            tracing::warn!(error = %e, "[health-check] failed to ping DB");
            AppError::Database(e)
        })?;

        let message = json!({ "ts": Utc::now() }).to_string();
        self.bus
            .round_trip(&self.queue, &message)
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, "[health-check] failed to send message to broker");
            })?;

        Ok(())
    }
}
