//! Email delivery through the Resend HTTP API.

use reqwest::Client;
use serde::Serialize;

use herald_common::error::AppError;
use herald_common::types::RenderedPayload;

#[derive(Debug, Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: String,
}

pub struct EmailSender {
    http: Client,
    url: String,
    api_key: String,
    from: String,
}

impl EmailSender {
    pub fn new(http: Client, base_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            http,
            url: format!("{}/emails", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }

    pub async fn send(&self, destination: &str, payload: &RenderedPayload) -> Result<(), AppError> {
        if !destination.contains('@') {
            return Err(AppError::Channel(format!(
                "invalid email destination '{destination}'"
            )));
        }

        let email = ResendEmail {
            from: &self.from,
            to: vec![destination],
            subject: &payload.title,
            html: render_html(payload),
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!("Email sent");
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(AppError::Channel(format!(
                "Resend request failed with {status}: {error_text}"
            )))
        }
    }
}

fn render_html(payload: &RenderedPayload) -> String {
    let mut html = format!(
        "<h1>{}</h1><p>{}</p>",
        escape(&payload.title),
        escape(&payload.body)
    );
    if let Some(link) = &payload.deeplink {
        html.push_str(&format!("<p><a href=\"{}\">Open</a></p>", escape(link)));
    }
    html
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
