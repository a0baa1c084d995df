//! Delivery channels.
//!
//! Senders are at-least-once effort and never retry: idempotency is the
//! ledger's job, retries belong to whoever replays the event.

mod email;
mod inapp;
mod push;

pub use email::EmailSender;
pub use inapp::InAppSender;
pub use push::{PushSender, TOPIC_PREFIX};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use herald_common::bus::EventBus;
use herald_common::config::AppConfig;
use herald_common::error::AppError;
use herald_common::types::{Channel, RenderedPayload};

/// Anything able to deliver a rendered payload on a channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(
        &self,
        cancel: &CancellationToken,
        channel: Channel,
        destination: &str,
        payload: &RenderedPayload,
    ) -> Result<(), AppError>;
}

pub(crate) fn ensure_active(cancel: &CancellationToken, channel: Channel) -> Result<(), AppError> {
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled(format!(
            "{channel} delivery aborted before sending"
        )));
    }
    Ok(())
}

/// Routes each delivery to the sender configured for its channel.
#[derive(Default)]
pub struct ChannelSenders {
    push: Option<PushSender>,
    email: Option<EmailSender>,
    in_app: Option<InAppSender>,
}

impl ChannelSenders {
    /// Build every sender the configuration has credentials for.
    ///
    /// In-app delivery only needs Redis and is therefore always available.
    pub fn from_config(config: &AppConfig, bus: &EventBus) -> Self {
        let http = reqwest::Client::new();

        let push = match (&config.fcm_project_id, &config.fcm_access_token) {
            (Some(project), Some(token)) => Some(PushSender::new(
                http.clone(),
                &config.fcm_base_url,
                project,
                token,
            )),
            _ => {
                tracing::warn!("FCM credentials missing, push delivery disabled");
                None
            }
        };

        let email = match (&config.resend_api_key, &config.email_from) {
            (Some(key), Some(from)) => Some(EmailSender::new(
                http,
                &config.resend_base_url,
                key,
                from,
            )),
            _ => {
                tracing::warn!("Resend credentials missing, email delivery disabled");
                None
            }
        };

        Self {
            push,
            email,
            in_app: Some(InAppSender::new(bus.connection(), config.inapp_feed_max_len)),
        }
    }
}

#[async_trait]
impl ChannelSender for ChannelSenders {
    async fn send(
        &self,
        cancel: &CancellationToken,
        channel: Channel,
        destination: &str,
        payload: &RenderedPayload,
    ) -> Result<(), AppError> {
        ensure_active(cancel, channel)?;

        let not_configured = || AppError::Channel(format!("{channel} channel is not configured"));
        match channel {
            Channel::Push => {
                self.push
                    .as_ref()
                    .ok_or_else(not_configured)?
                    .send(destination, payload)
                    .await
            }
            Channel::Email => {
                self.email
                    .as_ref()
                    .ok_or_else(not_configured)?
                    .send(destination, payload)
                    .await
            }
            Channel::InApp => {
                self.in_app
                    .as_ref()
                    .ok_or_else(not_configured)?
                    .send(destination, payload)
                    .await
            }
        }
    }
}
