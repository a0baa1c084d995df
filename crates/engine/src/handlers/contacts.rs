use async_trait::async_trait;

use herald_common::error::AppError;
use herald_common::types::{Event, EventKind, NotificationIntent, NotificationType};

use super::{EventHandler, HandlerContext, misrouted, require};

/// Tells a user that someone from their agenda joined.
pub struct AgendaContactAddedHandler {
    ctx: HandlerContext,
}

impl AgendaContactAddedHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for AgendaContactAddedHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::AgendaContactAdded(added) = event else {
            return Err(misrouted(EventKind::AgendaContactAdded, event));
        };
        require("user_id", &added.user_id)?;
        require("contact_user_id", &added.contact_user_id)?;

        if added.user_id == added.contact_user_id {
            return Ok(Vec::new());
        }

        self.ctx
            .notify_user(
                &added.user_id,
                NotificationType::ContactJoined,
                format!("agenda-contact:{}", added.contact_user_id),
                &[
                    ("username", added.contact_username.clone()),
                    ("contact_user_id", added.contact_user_id.clone()),
                ],
            )
            .await
    }
}
