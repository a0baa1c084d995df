//! Broadcast notifications: news and adoption milestones.
//!
//! Announcements target push topics and shared in-app feeds instead of
//! individual users, so they need no directory lookup.

use async_trait::async_trait;

use herald_common::error::AppError;
use herald_common::types::{
    Channel, Delivery, Event, EventKind, NotificationIntent, NotificationType, RenderedPayload,
    Scope,
};
use herald_notifier::TOPIC_PREFIX;

use super::{EventHandler, HandlerContext, misrouted, require};

/// Shared in-app feed readers subscribe to for a language.
pub fn announcement_feed(language: &str) -> String {
    format!("announcements:{language}")
}

fn broadcast(
    kind: NotificationType,
    language: &str,
    uniqueness: String,
    topic: String,
    payload: RenderedPayload,
) -> NotificationIntent {
    NotificationIntent {
        scope: Scope::Broadcast,
        language: language.to_string(),
        notification_type: kind,
        uniqueness,
        deliveries: vec![
            Delivery {
                channel: Channel::Push,
                destination: format!("{TOPIC_PREFIX}{topic}"),
                payload: payload.clone(),
            },
            Delivery {
                channel: Channel::InApp,
                destination: announcement_feed(language),
                payload,
            },
        ],
    }
}

pub struct NewsPublishedHandler {
    ctx: HandlerContext,
}

impl NewsPublishedHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for NewsPublishedHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::NewsPublished(news) = event else {
            return Err(misrouted(EventKind::NewsPublished, event));
        };
        require("news_id", &news.news_id)?;
        require("title", &news.title)?;
        require("language", &news.language)?;

        let language = self
            .ctx
            .templates
            .resolve_language(NotificationType::NewsAdded, &news.language);
        let mut payload = self.ctx.templates.render(
            NotificationType::NewsAdded,
            language,
            &[
                ("title", news.title.clone()),
                ("news_id", news.news_id.clone()),
                ("news_type", news.news_type.as_str().to_string()),
            ],
        )?;
        payload.image_url = news.image_url.clone();

        // Topic follows the article's own language, not the template fallback.
        let topic_language = news.language.to_lowercase();

        Ok(vec![broadcast(
            NotificationType::NewsAdded,
            &topic_language,
            format!("news:{}", news.news_id),
            format!("news_{topic_language}"),
            payload,
        )])
    }
}

/// Announces a new adoption milestone in every supported language.
pub struct AdoptionChangedHandler {
    ctx: HandlerContext,
}

impl AdoptionChangedHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl EventHandler for AdoptionChangedHandler {
    async fn handle(&self, event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
        let Event::AdoptionChanged(adoption) = event else {
            return Err(misrouted(EventKind::AdoptionChanged, event));
        };
        if !adoption.base_mining_rate.is_finite() || adoption.base_mining_rate < 0.0 {
            return Err(AppError::Validation(format!(
                "base mining rate must be non-negative, got {}",
                adoption.base_mining_rate
            )));
        }

        let vars = [
            ("milestone", adoption.milestone.to_string()),
            ("rate", adoption.base_mining_rate.to_string()),
        ];

        self.ctx
            .templates
            .supported_languages()
            .into_iter()
            .map(|language| -> Result<NotificationIntent, AppError> {
                let payload =
                    self.ctx
                        .templates
                        .render(NotificationType::AdoptionChanged, language, &vars)?;
                Ok(broadcast(
                    NotificationType::AdoptionChanged,
                    language,
                    format!("adoption:{}", adoption.milestone),
                    format!("adoption_{language}"),
                    payload,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use herald_common::config::DisabledAchievementNotifications;
    use herald_common::types::{AdoptionChanged, NewsPublished, NewsType};

    use super::*;
    use crate::handlers::test_support::context_with_user;

    #[tokio::test]
    async fn test_news_is_a_topic_broadcast() {
        let ctx = context_with_user(DisabledAchievementNotifications::default()).await;
        let intents = NewsPublishedHandler::new(ctx)
            .handle(&Event::NewsPublished(NewsPublished {
                news_id: "n-42".to_string(),
                language: "de".to_string(),
                title: "Update".to_string(),
                news_type: NewsType::Featured,
                image_url: Some("https://cdn.example.com/n-42.png".to_string()),
                published_at: Utc::now(),
            }))
            .await
            .unwrap();

        assert_eq!(intents.len(), 1);
        let intent = &intents[0];
        assert_eq!(intent.scope, Scope::Broadcast);
        assert_eq!(intent.uniqueness, "news:n-42");
        assert_eq!(intent.deliveries[0].destination, "topic:news_de");
        assert_eq!(intent.deliveries[1].destination, "announcements:de");
        assert_eq!(
            intent.deliveries[0].payload.image_url.as_deref(),
            Some("https://cdn.example.com/n-42.png")
        );
        assert_eq!(intent.deliveries[0].payload.body, "Lies die neuesten Nachrichten.");
    }

    #[tokio::test]
    async fn test_news_without_language_is_rejected() {
        let ctx = context_with_user(DisabledAchievementNotifications::default()).await;
        let result = NewsPublishedHandler::new(ctx)
            .handle(&Event::NewsPublished(NewsPublished {
                news_id: "n-43".to_string(),
                language: " ".to_string(),
                title: "Update".to_string(),
                news_type: NewsType::Regular,
                image_url: None,
                published_at: Utc::now(),
            }))
            .await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("language")));
    }

    #[tokio::test]
    async fn test_adoption_is_announced_per_language() {
        let ctx = context_with_user(DisabledAchievementNotifications::default()).await;
        let intents = AdoptionChangedHandler::new(ctx)
            .handle(&Event::AdoptionChanged(AdoptionChanged {
                milestone: 4,
                base_mining_rate: 4.0,
                changed_at: Utc::now(),
            }))
            .await
            .unwrap();

        let topics: Vec<&str> = intents
            .iter()
            .map(|intent| intent.deliveries[0].destination.as_str())
            .collect();
        assert_eq!(
            topics,
            vec!["topic:adoption_de", "topic:adoption_en", "topic:adoption_es"]
        );
        assert!(intents.iter().all(|intent| intent.uniqueness == "adoption:4"));
    }
}
