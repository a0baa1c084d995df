//! Badge, level and role notifications.
//!
//! Each is suppressible by name through the disabled-achievement lists in
//! the configuration. Names compare case-insensitively.

use async_trait::async_trait;

use herald_common::error::AppError;
use herald_common::types::{Event, EventKind, NotificationIntent, NotificationType};

use super::{EventHandler, HandlerContext, misrouted, require};

pub struct BadgeAchievedHandler {
    ctx: HandlerContext,
}

impl BadgeAchievedHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for BadgeAchievedHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::BadgeAchieved(achieved) = event else {
            return Err(misrouted(EventKind::BadgeAchieved, event));
        };
        require("user_id", &achieved.user_id)?;
        require("badge", &achieved.badge)?;

        if self.ctx.config.is_badge_notification_disabled(&achieved.badge) {
            tracing::debug!(badge = %achieved.badge, "Badge notifications disabled");
            return Ok(Vec::new());
        }

        self.ctx
            .notify_user(
                &achieved.user_id,
                NotificationType::BadgeUnlocked,
                format!("badge:{}", achieved.badge.to_lowercase()),
                &[
                    ("badge", achieved.badge.clone()),
                    ("group", achieved.group.clone()),
                ],
            )
            .await
    }
}

pub struct LevelCompletedHandler {
    ctx: HandlerContext,
}

impl LevelCompletedHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for LevelCompletedHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::LevelCompleted(completed) = event else {
            return Err(misrouted(EventKind::LevelCompleted, event));
        };
        require("user_id", &completed.user_id)?;
        require("level", &completed.level)?;

        if self.ctx.config.is_level_notification_disabled(&completed.level) {
            tracing::debug!(level = %completed.level, "Level notifications disabled");
            return Ok(Vec::new());
        }

        self.ctx
            .notify_user(
                &completed.user_id,
                NotificationType::LevelCompleted,
                format!("level:{}", completed.level.to_lowercase()),
                &[("level", completed.level.clone())],
            )
            .await
    }
}

pub struct RoleEnabledHandler {
    ctx: HandlerContext,
}

impl RoleEnabledHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for RoleEnabledHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::RoleEnabled(enabled) = event else {
            return Err(misrouted(EventKind::RoleEnabled, event));
        };
        require("user_id", &enabled.user_id)?;
        require("role", &enabled.role)?;

        if self.ctx.config.is_role_notification_disabled(&enabled.role) {
            tracing::debug!(role = %enabled.role, "Role notifications disabled");
            return Ok(Vec::new());
        }

        self.ctx
            .notify_user(
                &enabled.user_id,
                NotificationType::RoleChanged,
                format!("role:{}", enabled.role.to_lowercase()),
                &[("role", enabled.role.clone())],
            )
            .await
    }
}
