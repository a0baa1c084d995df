use async_trait::async_trait;

use herald_common::error::AppError;
use herald_common::types::{Event, EventKind, NotificationIntent, NotificationType};

use super::{EventHandler, HandlerContext, misrouted, require};

pub struct DailyBonusHandler {
    ctx: HandlerContext,
}

impl DailyBonusHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for DailyBonusHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::DailyBonusAvailable(bonus) = event else {
            return Err(misrouted(EventKind::DailyBonusAvailable, event));
        };
        require("user_id", &bonus.user_id)?;
        if !bonus.amount.is_finite() || bonus.amount <= 0.0 {
            return Err(AppError::Validation(format!(
                "bonus amount must be positive, got {}",
                bonus.amount
            )));
        }

        self.ctx
            .notify_user(
                &bonus.user_id,
                NotificationType::DailyBonus,
                format!("daily-bonus:{}", bonus.bonus_index),
                &[("amount", bonus.amount.to_string())],
            )
            .await
    }
}

pub struct PingDueHandler {
    ctx: HandlerContext,
}

impl PingDueHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for PingDueHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::PingDue(ping) = event else {
            return Err(misrouted(EventKind::PingDue, event));
        };
        require("user_id", &ping.user_id)?;
        require("pinged_by", &ping.pinged_by)?;

        // A user may be pinged again later; the timestamp keeps each ping distinct.
        self.ctx
            .notify_user(
                &ping.user_id,
                NotificationType::Ping,
                format!("ping:{}:{}", ping.pinged_by, ping.pinged_at.timestamp()),
                &[("username", ping.pinged_by.clone())],
            )
            .await
    }
}

pub struct DaysOffStartedHandler {
    ctx: HandlerContext,
}

impl DaysOffStartedHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for DaysOffStartedHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::DaysOffStarted(days_off) = event else {
            return Err(misrouted(EventKind::DaysOffStarted, event));
        };
        require("user_id", &days_off.user_id)?;

        self.ctx
            .notify_user(
                &days_off.user_id,
                NotificationType::DaysOffStarted,
                format!("day-off:{}", days_off.day_off_number),
                &[
                    ("day", days_off.day_off_number.to_string()),
                    ("remaining", days_off.remaining.to_string()),
                ],
            )
            .await
    }
}
