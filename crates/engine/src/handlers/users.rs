use async_trait::async_trait;

use herald_common::error::AppError;
use herald_common::types::{
    Channel, Event, EventKind, NotificationIntent, NotificationType, RecipientProfile,
};

use super::{EventHandler, HandlerContext, misrouted, require};

/// Records the new user and welcomes them by email and in-app.
pub struct UserCreatedHandler {
    ctx: HandlerContext,
}

impl UserCreatedHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for UserCreatedHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::UserCreated(user) = event else {
            return Err(misrouted(EventKind::UserCreated, event));
        };
        require("user_id", &user.user_id)?;
        require("username", &user.username)?;

        self.ctx.directory.upsert_user(user).await?;

        // The event carries everything the welcome needs; devices come later.
        let profile = RecipientProfile {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            language: user.language.clone(),
            email: user.email.clone().filter(|email| !email.trim().is_empty()),
            push_tokens: Vec::new(),
        };

        Ok(self
            .ctx
            .personal_intent(
                &profile,
                NotificationType::Welcome,
                "welcome".to_string(),
                &[Channel::Email, Channel::InApp],
                &[("username", user.username.clone())],
            )?
            .into_iter()
            .collect())
    }
}

/// Keeps push tokens current. Produces no notification.
pub struct DeviceRegisteredHandler {
    ctx: HandlerContext,
}

impl DeviceRegisteredHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for DeviceRegisteredHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::DeviceRegistered(device) = event else {
            return Err(misrouted(EventKind::DeviceRegistered, event));
        };
        require("user_id", &device.user_id)?;
        require("device_id", &device.device_id)?;
        require("push_token", &device.push_token)?;

        self.ctx.directory.upsert_device(device).await?;
        tracing::debug!(
            user_id = %device.user_id,
            device_id = %device.device_id,
            "Device registered"
        );

        Ok(Vec::new())
    }
}
