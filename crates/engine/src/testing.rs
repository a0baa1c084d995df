//! Test doubles shared by the engine's unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use herald_common::error::AppError;
use herald_common::types::{
    Channel, Delivery, NotificationIntent, NotificationType, RenderedPayload, Scope,
};
use herald_notifier::ChannelSender;

/// Records every delivery; fails for configured destinations.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(Channel, String, RenderedPayload)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(destinations: &[&str]) -> Self {
        let sender = Self::default();
        sender
            .failing
            .lock()
            .unwrap()
            .extend(destinations.iter().map(|d| d.to_string()));
        sender
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn destinations(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, destination, _)| destination.clone())
            .collect()
    }
}

#[async_trait]
impl ChannelSender for RecordingSender {
    async fn send(
        &self,
        _cancel: &CancellationToken,
        channel: Channel,
        destination: &str,
        payload: &RenderedPayload,
    ) -> Result<(), AppError> {
        if self.failing.lock().unwrap().contains(destination) {
            return Err(AppError::Channel(format!("{channel} rejected {destination}")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel, destination.to_string(), payload.clone()));
        Ok(())
    }
}

pub fn delivery(channel: Channel, destination: &str) -> Delivery {
    Delivery {
        channel,
        destination: destination.to_string(),
        payload: RenderedPayload {
            title: "title".to_string(),
            body: "body".to_string(),
            image_url: None,
            deeplink: None,
            data: serde_json::json!({}),
        },
    }
}

pub fn intent(
    scope: Scope,
    notification_type: NotificationType,
    uniqueness: &str,
    deliveries: Vec<Delivery>,
) -> NotificationIntent {
    NotificationIntent {
        scope,
        language: "en".to_string(),
        notification_type,
        uniqueness: uniqueness.to_string(),
        deliveries,
    }
}
