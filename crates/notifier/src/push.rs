//! Push delivery over the FCM HTTP v1 API.

use std::collections::HashMap;

use reqwest::Client;
use serde::Serialize;

use herald_common::error::AppError;
use herald_common::types::RenderedPayload;

/// Destinations with this prefix address an FCM topic instead of a device token.
pub const TOPIC_PREFIX: &str = "topic:";

#[derive(Debug, Serialize)]
struct FcmRequest {
    message: FcmMessage,
}

#[derive(Debug, Serialize)]
struct FcmMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    notification: FcmNotification,
    data: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct FcmNotification {
    title: String,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

pub struct PushSender {
    http: Client,
    url: String,
    access_token: String,
}

impl PushSender {
    pub fn new(http: Client, base_url: &str, project_id: &str, access_token: &str) -> Self {
        tracing::info!(project_id, "FCM push sender initialized");
        Self {
            http,
            url: format!(
                "{}/v1/projects/{}/messages:send",
                base_url.trim_end_matches('/'),
                project_id
            ),
            access_token: access_token.to_string(),
        }
    }

    pub async fn send(&self, destination: &str, payload: &RenderedPayload) -> Result<(), AppError> {
        let request = FcmRequest {
            message: build_message(destination, payload),
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!(destination, "Push notification sent");
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(AppError::Channel(format!(
                "FCM request failed with {status}: {error_text}"
            )))
        }
    }
}

fn build_message(destination: &str, payload: &RenderedPayload) -> FcmMessage {
    let (token, topic) = match destination.strip_prefix(TOPIC_PREFIX) {
        Some(topic) => (None, Some(topic.to_string())),
        None => (Some(destination.to_string()), None),
    };

    // FCM only accepts string values in `data`.
    let mut data: HashMap<String, String> = payload
        .data
        .as_object()
        .map(|fields| {
            fields
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default();
    if let Some(deeplink) = &payload.deeplink {
        data.insert("deeplink".to_string(), deeplink.clone());
    }

    FcmMessage {
        token,
        topic,
        notification: FcmNotification {
            title: payload.title.clone(),
            body: payload.body.clone(),
            image: payload.image_url.clone(),
        },
        data,
    }
}
