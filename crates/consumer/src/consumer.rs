//! Event consumer loop.
//!
//! Pops batches from the event source, decodes them and hands them to the
//! router. A message that fails to decode is logged and dropped. A batch whose
//! routing fails is logged and the loop moves on; already-delivered parts are
//! protected from duplicates by the ledger if the producer replays.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use herald_common::error::AppError;
use herald_common::types::Event;
use herald_engine::router::ConsumerRouter;

use crate::source::EventSource;

pub struct EventConsumer<S> {
    source: S,
    router: Arc<ConsumerRouter>,
    batch_size: usize,
    poll_interval: Duration,
}

impl<S: EventSource> EventConsumer<S> {
    pub fn new(
        source: S,
        router: Arc<ConsumerRouter>,
        batch_size: usize,
        poll_interval_ms: u64,
    ) -> Self {
        Self {
            source,
            router,
            batch_size,
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }

    /// Consume until `cancel` fires.
    ///
    /// The loop only idles when the queue is empty or cannot be read. A batch
    /// whose routing failed is logged and the next one is popped right away.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Event consumer started"
        );

        while !cancel.is_cancelled() {
            let idle = match self.source.pop_batch(self.batch_size).await {
                Ok(raw) if raw.is_empty() => true,
                Ok(raw) => {
                    if let Err(e) = self.process(&cancel, raw).await {
                        tracing::error!(error = %e, "Failed to process event batch");
                    }
                    false
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to pop event batch");
                    true
                }
            };

            if idle {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        tracing::info!("Event consumer stopped");
    }

    /// Consume until `shutdown` resolves, then cancel and wait for the batch
    /// in flight to settle. Deliveries that had not been sent yet fail with
    /// `Cancelled` and release their ledger rows.
    pub async fn run_until<F>(&self, cancel: CancellationToken, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let run = self.run(cancel.clone());
        tokio::pin!(run);

        tokio::select! {
            _ = &mut run => return,
            _ = shutdown => {
                tracing::info!("Shutdown requested, draining in-flight batch");
            }
        }

        cancel.cancel();
        run.await;
    }

    /// Pop, decode and route one batch. Returns how many raw messages were popped.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> Result<usize, AppError> {
        let raw = self.source.pop_batch(self.batch_size).await?;
        let popped = raw.len();
        if popped > 0 {
            self.process(cancel, raw).await?;
        }
        Ok(popped)
    }

    async fn process(&self, cancel: &CancellationToken, raw: Vec<String>) -> Result<(), AppError> {
        let events = decode_batch(raw);
        if events.is_empty() {
            return Ok(());
        }

        let count = events.len();
        let summary = self.router.route_batch(cancel, events).await?;
        tracing::info!(
            events = count,
            sent = summary.sent,
            skipped = summary.skipped,
            "Processed event batch"
        );
        Ok(())
    }
}

/// Decode raw messages, dropping the ones that are not valid events.
pub fn decode_batch(raw: Vec<String>) -> Vec<Event> {
    raw.into_iter()
        .filter_map(|message| match serde_json::from_str::<Event>(&message) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, message = %message, "Dropping malformed event");
                None
            }
        })
        .collect()
}
