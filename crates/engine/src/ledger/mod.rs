//! Sent-record ledger: the idempotency store behind every delivery.
//!
//! A row keyed by (recipient or none, uniqueness, type, channel, channel value)
//! means the delivery already happened. The store's unique insert is the only
//! serialization point between concurrent dispatches: of N concurrent
//! reservations for one key exactly one wins.

mod memory;
mod postgres;

pub use memory::InMemorySentRecordStore;
pub use postgres::PgSentRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use herald_common::error::AppError;
use herald_common::types::{SentRecord, SentRecordKey};

#[async_trait]
pub trait SentRecordStore: Send + Sync {
    /// Insert the record unless its key exists.
    ///
    /// Returns `false` when the key was already present (already delivered).
    async fn reserve(&self, record: &SentRecord) -> Result<bool, AppError>;

    /// Delete the row for `key`. Deleting a missing row is not an error.
    async fn release(&self, key: &SentRecordKey) -> Result<(), AppError>;

    /// Delete every row with `sent_at < cutoff` and return how many went away.
    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}
