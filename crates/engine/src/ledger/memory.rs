use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use herald_common::error::AppError;
use herald_common::types::{SentRecord, SentRecordKey};

use super::SentRecordStore;

/// Process-local ledger with the same semantics as the Postgres one.
///
/// Useful for tests and single-instance runs; rows do not survive a restart.
#[derive(Default)]
pub struct InMemorySentRecordStore {
    rows: Mutex<HashMap<SentRecordKey, SentRecord>>,
}

impl InMemorySentRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    pub async fn contains(&self, key: &SentRecordKey) -> bool {
        self.rows.lock().await.contains_key(key)
    }
}

#[async_trait]
impl SentRecordStore for InMemorySentRecordStore {
    async fn reserve(&self, record: &SentRecord) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&record.key) {
            return Ok(false);
        }
        rows.insert(record.key.clone(), record.clone());
        Ok(true)
    }

    async fn release(&self, key: &SentRecordKey) -> Result<(), AppError> {
        self.rows.lock().await.remove(key);
        Ok(())
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, record| record.sent_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}
