//! Dispatch engine: turns notification intents into deliveries, at most once.
//!
//! For every (intent, delivery) pair:
//! 1. Reserve the ledger row (unique insert). Losing the race means the
//!    delivery already happened: skip it and report success.
//! 2. Send through the [`ChannelSender`].
//! 3. On send failure, release the reserved row so a later attempt may retry.
//!
//! All deliveries of all intents run concurrently; failures are collected,
//! never short-circuited.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use herald_common::error::{AggregateError, AppError};
use herald_common::types::{NotificationIntent, SentRecord};
use herald_notifier::ChannelSender;

use crate::concurrency::run_concurrently;
use crate::ledger::SentRecordStore;

/// What happened to a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    AlreadySent,
}

/// Counts of a successful dispatch call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub skipped: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Sent => self.sent += 1,
            DeliveryOutcome::AlreadySent => self.skipped += 1,
        }
    }

    pub fn merge(mut self, other: DispatchSummary) -> Self {
        self.sent += other.sent;
        self.skipped += other.skipped;
        self
    }
}

pub struct DispatchEngine {
    ledger: Arc<dyn SentRecordStore>,
    sender: Arc<dyn ChannelSender>,
}

impl DispatchEngine {
    pub fn new(ledger: Arc<dyn SentRecordStore>, sender: Arc<dyn ChannelSender>) -> Self {
        Self { ledger, sender }
    }

    /// Dispatch a batch of intents concurrently.
    ///
    /// Returns the aggregated error of every failed delivery, labelled
    /// `intent[i] …/channel:destination`, when anything failed.
    pub async fn dispatch(
        self: &Arc<Self>,
        cancel: &CancellationToken,
        intents: Vec<NotificationIntent>,
    ) -> Result<DispatchSummary, AppError> {
        let summaries = run_concurrently(
            cancel,
            intents,
            |ix, intent| {
                format!(
                    "intent[{ix}] {}:{}",
                    intent.notification_type, intent.uniqueness
                )
            },
            |intent| {
                let engine = Arc::clone(self);
                let cancel = cancel.clone();
                async move { engine.dispatch_intent(&cancel, intent).await }
            },
        )
        .await?;

        Ok(summaries
            .into_iter()
            .fold(DispatchSummary::default(), DispatchSummary::merge))
    }

    async fn dispatch_intent(
        self: &Arc<Self>,
        cancel: &CancellationToken,
        intent: NotificationIntent,
    ) -> Result<DispatchSummary, AppError> {
        let intent = Arc::new(intent);
        let indexes: Vec<usize> = (0..intent.deliveries.len()).collect();

        let outcomes = run_concurrently(
            cancel,
            indexes,
            |_, &ix| {
                let delivery = &intent.deliveries[ix];
                format!("{}:{}", delivery.channel, delivery.destination)
            },
            |ix| {
                let engine = Arc::clone(self);
                let intent = Arc::clone(&intent);
                let cancel = cancel.clone();
                async move { engine.deliver(&cancel, &intent, ix).await }
            },
        )
        .await?;

        let mut summary = DispatchSummary::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        Ok(summary)
    }

    /// Reserve, send, and compensate on failure for one delivery.
    async fn deliver(
        &self,
        cancel: &CancellationToken,
        intent: &NotificationIntent,
        ix: usize,
    ) -> Result<DeliveryOutcome, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled(
                "delivery aborted before reservation".to_string(),
            ));
        }

        let delivery = &intent.deliveries[ix];
        let record = SentRecord::for_delivery(intent, delivery, Utc::now());

        if !self.ledger.reserve(&record).await? {
            tracing::debug!(
                user_id = ?record.key.user_id,
                uniqueness = %record.key.uniqueness,
                notification_type = %record.key.notification_type,
                channel = %record.key.channel,
                "Delivery skipped, already sent"
            );
            return Ok(DeliveryOutcome::AlreadySent);
        }

        match self
            .sender
            .send(cancel, delivery.channel, &delivery.destination, &delivery.payload)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    user_id = ?record.key.user_id,
                    uniqueness = %record.key.uniqueness,
                    notification_type = %record.key.notification_type,
                    channel = %record.key.channel,
                    "Notification delivered"
                );
                Ok(DeliveryOutcome::Sent)
            }
            Err(send_err) => {
                tracing::warn!(
                    error = %send_err,
                    uniqueness = %record.key.uniqueness,
                    channel = %record.key.channel,
                    "Delivery failed, releasing sent record"
                );
                if let Err(release_err) = self.ledger.release(&record.key).await {
                    tracing::error!(
                        error = %release_err,
                        uniqueness = %record.key.uniqueness,
                        channel = %record.key.channel,
                        "Failed to release sent record after delivery failure"
                    );
                    let mut failures = AggregateError::new(2);
                    failures.push("send", send_err);
                    failures.push("release", release_err);
                    return Err(AppError::Aggregate(failures));
                }
                Err(send_err)
            }
        }
    }
}
