//! Retention sweeper: prunes sent records past their retention window.
//!
//! Once a record is older than the retention window its notification may be
//! sent again. The interval is picked at random so that several instances do
//! not sweep in lockstep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use herald_common::error::AppError;

use crate::ledger::SentRecordStore;

pub const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
pub const SWEEP_DEADLINE: Duration = Duration::from_secs(30);

pub struct RetentionSweeper {
    store: Arc<dyn SentRecordStore>,
    interval: Duration,
    retention: Duration,
    deadline: Duration,
}

impl RetentionSweeper {
    /// Sweeper with a random interval between 1 and 24 minutes.
    pub fn new(store: Arc<dyn SentRecordStore>) -> Self {
        let minutes: u64 = rand::rng().random_range(1..=24);
        Self::with_interval(store, Duration::from_secs(minutes * 60))
    }

    pub fn with_interval(store: Arc<dyn SentRecordStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            retention: RETENTION,
            deadline: SWEEP_DEADLINE,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Delete every record older than the retention window.
    pub async fn sweep_once(&self) -> Result<u64, AppError> {
        let retention = chrono::Duration::from_std(self.retention)
            .map_err(|e| AppError::Config(format!("retention out of range: {e}")))?;
        let cutoff = Utc::now() - retention;

        let deleted = tokio::time::timeout(self.deadline, self.store.prune_older_than(cutoff))
            .await
            .map_err(|_| {
                AppError::DeadlineExceeded(format!(
                    "retention sweep did not finish within {:?}",
                    self.deadline
                ))
            })??;

        if deleted > 0 {
            tracing::info!(deleted, %cutoff, "Pruned expired sent records");
        } else {
            tracing::debug!(%cutoff, "No expired sent records");
        }
        Ok(deleted)
    }

    /// Sweep on every tick until `cancel` fires. Failed passes are logged and
    /// retried on the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Retention sweeper started");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // An in-flight pass is abandoned on cancellation.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.sweep_once() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Retention sweep failed");
                    }
                }
            }
        }

        tracing::info!("Retention sweeper stopped");
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
