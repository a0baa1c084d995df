//! Event handlers, one per inbound event kind.
//!
//! A handler maps one event to zero or more notification intents. It checks
//! suppression settings first, then reads whatever recipient data it needs
//! from the directory. "Nothing to send" is an empty vec, never an error.

mod achievements;
mod announcements;
mod contacts;
mod mining;
mod users;

pub use achievements::{BadgeAchievedHandler, LevelCompletedHandler, RoleEnabledHandler};
pub use announcements::{AdoptionChangedHandler, NewsPublishedHandler};
pub use contacts::AgendaContactAddedHandler;
pub use mining::{DailyBonusHandler, DaysOffStartedHandler, PingDueHandler};
pub use users::{DeviceRegisteredHandler, UserCreatedHandler};

use std::sync::Arc;

use async_trait::async_trait;

use herald_common::config::AppConfig;
use herald_common::error::AppError;
use herald_common::types::{
    Channel, Delivery, Event, EventKind, NotificationIntent, NotificationType, RecipientProfile,
    Scope,
};

use crate::directory::RecipientDirectory;
use crate::templates::Templates;

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError>;
}

/// Read-only collaborators shared by every handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn RecipientDirectory>,
    pub templates: Arc<Templates>,
}

impl HandlerContext {
    pub fn new(
        config: Arc<AppConfig>,
        directory: Arc<dyn RecipientDirectory>,
        templates: Arc<Templates>,
    ) -> Self {
        Self {
            config,
            directory,
            templates,
        }
    }

    /// Fetch a recipient, logging when they are unknown.
    async fn recipient(&self, user_id: &str) -> Result<Option<RecipientProfile>, AppError> {
        let profile = self.directory.profile(user_id).await?;
        if profile.is_none() {
            tracing::debug!(user_id, "Recipient unknown, nothing to notify");
        }
        Ok(profile)
    }

    /// Build a personal intent for `profile` over the requested channels.
    ///
    /// Push fans out to every registered device; email needs an address.
    /// Returns `None` when the recipient is unreachable on every channel.
    fn personal_intent(
        &self,
        profile: &RecipientProfile,
        kind: NotificationType,
        uniqueness: String,
        channels: &[Channel],
        vars: &[(&str, String)],
    ) -> Result<Option<NotificationIntent>, AppError> {
        let language = self.templates.resolve_language(kind, &profile.language);
        let payload = self.templates.render(kind, language, vars)?;

        let mut deliveries = Vec::new();
        for &channel in channels {
            match channel {
                Channel::Push => {
                    deliveries.extend(profile.push_tokens.iter().map(|token| Delivery {
                        channel,
                        destination: token.clone(),
                        payload: payload.clone(),
                    }));
                }
                Channel::Email => {
                    if let Some(email) = &profile.email {
                        deliveries.push(Delivery {
                            channel,
                            destination: email.clone(),
                            payload: payload.clone(),
                        });
                    }
                }
                Channel::InApp => deliveries.push(Delivery {
                    channel,
                    destination: profile.user_id.clone(),
                    payload: payload.clone(),
                }),
            }
        }

        if deliveries.is_empty() {
            return Ok(None);
        }

        Ok(Some(NotificationIntent {
            scope: Scope::Personal {
                user_id: profile.user_id.clone(),
            },
            language: language.to_string(),
            notification_type: kind,
            uniqueness,
            deliveries,
        }))
    }

    /// Lookup + build in one go for the common personal case.
    async fn notify_user(
        &self,
        user_id: &str,
        kind: NotificationType,
        uniqueness: String,
        vars: &[(&str, String)],
    ) -> Result<Vec<NotificationIntent>, AppError> {
        let Some(profile) = self.recipient(user_id).await? else {
            return Ok(Vec::new());
        };
        Ok(self
            .personal_intent(&profile, kind, uniqueness, PUSH_AND_IN_APP, vars)?
            .into_iter()
            .collect())
    }
}

const PUSH_AND_IN_APP: &[Channel] = &[Channel::Push, Channel::InApp];

/// Reject blank identifiers and names.
fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn misrouted(expected: EventKind, event: &Event) -> AppError {
    AppError::Internal(format!(
        "{} event routed to the {expected} handler",
        event.kind()
    ))
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use super::*;
    use crate::directory::InMemoryRecipientDirectory;
    use herald_common::config::DisabledAchievementNotifications;
    use herald_common::types::{DeviceRegistered, UserCreated};

    pub async fn context_with_user(disabled: DisabledAchievementNotifications) -> HandlerContext {
        let directory = Arc::new(InMemoryRecipientDirectory::new());
        directory
            .upsert_user(&UserCreated {
                user_id: "u-1".to_string(),
                username: "alice".to_string(),
                email: Some("alice@example.com".to_string()),
                language: "es-ES".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        directory
            .upsert_device(&DeviceRegistered {
                user_id: "u-1".to_string(),
                device_id: "phone".to_string(),
                push_token: "token-1".to_string(),
                registered_at: Utc::now(),
            })
            .await
            .unwrap();

        let config = AppConfig {
            disabled_achievements: disabled,
            ..Default::default()
        };
        HandlerContext::new(Arc::new(config), directory, Arc::new(Templates::builtin()))
    }
}
