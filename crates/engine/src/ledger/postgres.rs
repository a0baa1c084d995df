use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use herald_common::error::AppError;
use herald_common::types::{SentRecord, SentRecordKey};

use super::SentRecordStore;

/// Ledger backed by the `sent_notifications` / `sent_announcements` tables.
///
/// Personal rows carry the recipient in `user_id`; announcement rows have no
/// recipient column, so one row covers everybody.
#[derive(Clone)]
pub struct PgSentRecordStore {
    pool: PgPool,
}

impl PgSentRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SentRecordStore for PgSentRecordStore {
    async fn reserve(&self, record: &SentRecord) -> Result<bool, AppError> {
        let key = &record.key;
        let result = match &key.user_id {
            Some(user_id) => {
                sqlx::query(
                    r#"
                    INSERT INTO sent_notifications (
                        sent_at, language, user_id, uniqueness,
                        notification_type, notification_channel, notification_channel_value
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(record.sent_at)
                .bind(&record.language)
                .bind(user_id)
                .bind(&key.uniqueness)
                .bind(key.notification_type.as_str())
                .bind(key.channel.as_str())
                .bind(&key.channel_value)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO sent_announcements (
                        sent_at, language, uniqueness,
                        notification_type, notification_channel, notification_channel_value
                    )
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(record.sent_at)
                .bind(&record.language)
                .bind(&key.uniqueness)
                .bind(key.notification_type.as_str())
                .bind(key.channel.as_str())
                .bind(&key.channel_value)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, key: &SentRecordKey) -> Result<(), AppError> {
        match &key.user_id {
            Some(user_id) => {
                sqlx::query(
                    r#"
                    DELETE FROM sent_notifications
                    WHERE user_id = $1
                      AND uniqueness = $2
                      AND notification_type = $3
                      AND notification_channel = $4
                      AND notification_channel_value = $5
                    "#,
                )
                .bind(user_id)
                .bind(&key.uniqueness)
                .bind(key.notification_type.as_str())
                .bind(key.channel.as_str())
                .bind(&key.channel_value)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    DELETE FROM sent_announcements
                    WHERE uniqueness = $1
                      AND notification_type = $2
                      AND notification_channel = $3
                      AND notification_channel_value = $4
                    "#,
                )
                .bind(&key.uniqueness)
                .bind(key.notification_type.as_str())
                .bind(key.channel.as_str())
                .bind(&key.channel_value)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let notifications = sqlx::query("DELETE FROM sent_notifications WHERE sent_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let announcements = sqlx::query("DELETE FROM sent_announcements WHERE sent_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!(
            notifications,
            announcements,
            cutoff = %cutoff,
            "Pruned old sent records"
        );
        Ok(notifications + announcements)
    }
}
