//! Recipient directory: the local view of users and their devices.
//!
//! Handlers read profiles (locale, email, push tokens) from here. The
//! directory is kept current by the `user_created` and `device_registered`
//! events.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;

use herald_common::error::AppError;
use herald_common::types::{DeviceRegistered, RecipientProfile, UserCreated};

#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Look up a recipient; `None` when the user is unknown.
    async fn profile(&self, user_id: &str) -> Result<Option<RecipientProfile>, AppError>;

    async fn upsert_user(&self, user: &UserCreated) -> Result<(), AppError>;

    async fn upsert_device(&self, device: &DeviceRegistered) -> Result<(), AppError>;
}

/// Directory backed by the `users` and `user_devices` tables.
#[derive(Clone)]
pub struct PgRecipientDirectory {
    pool: PgPool,
}

impl PgRecipientDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientDirectory for PgRecipientDirectory {
    async fn profile(&self, user_id: &str) -> Result<Option<RecipientProfile>, AppError> {
        let row: Option<(String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT user_id, username, email, language FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, username, email, language)) = row else {
            return Ok(None);
        };

        let tokens: Vec<(String,)> = sqlx::query_as(
            "SELECT push_token FROM user_devices WHERE user_id = $1 ORDER BY registered_at DESC",
        )
        .bind(&user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(RecipientProfile {
            user_id,
            username,
            language,
            email,
            push_tokens: tokens.into_iter().map(|(token,)| token).collect(),
        }))
    }

    async fn upsert_user(&self, user: &UserCreated) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, email, language, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
               SET username = EXCLUDED.username,
                   email = EXCLUDED.email,
                   language = EXCLUDED.language,
                   updated_at = NOW()
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.language)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_device(&self, device: &DeviceRegistered) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_devices (user_id, device_id, push_token, registered_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, device_id) DO UPDATE
               SET push_token = EXCLUDED.push_token,
                   registered_at = EXCLUDED.registered_at
            "#,
        )
        .bind(&device.user_id)
        .bind(&device.device_id)
        .bind(&device.push_token)
        .bind(device.registered_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Default)]
struct DirectoryState {
    users: HashMap<String, UserCreated>,
    /// user id -> (device id -> push token)
    devices: HashMap<String, HashMap<String, String>>,
}

/// Process-local directory for tests and single-instance runs.
#[derive(Default)]
pub struct InMemoryRecipientDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryRecipientDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryRecipientDirectory {
    async fn profile(&self, user_id: &str) -> Result<Option<RecipientProfile>, AppError> {
        let state = self.state.lock().await;
        let Some(user) = state.users.get(user_id) else {
            return Ok(None);
        };

        let mut push_tokens: Vec<String> = state
            .devices
            .get(user_id)
            .map(|devices| devices.values().cloned().collect())
            .unwrap_or_default();
        push_tokens.sort();

        Ok(Some(RecipientProfile {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            language: user.language.clone(),
            email: user.email.clone(),
            push_tokens,
        }))
    }

    async fn upsert_user(&self, user: &UserCreated) -> Result<(), AppError> {
        self.state
            .lock()
            .await
            .users
            .insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn upsert_device(&self, device: &DeviceRegistered) -> Result<(), AppError> {
        self.state
            .lock()
            .await
            .devices
            .entry(device.user_id.clone())
            .or_default()
            .insert(device.device_id.clone(), device.push_token.clone());
        Ok(())
    }
}
