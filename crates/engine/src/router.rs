//! Consumer router: event kind to handler, handler output to the dispatch engine.
//!
//! The registry is complete and fixed once built. Every [`EventKind`] has
//! exactly one handler, so routing an event can never miss.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use herald_common::error::AppError;
use herald_common::types::{Event, EventKind};

use crate::concurrency::run_concurrently;
use crate::dispatch::{DispatchEngine, DispatchSummary};
use crate::handlers::{
    AdoptionChangedHandler, AgendaContactAddedHandler, BadgeAchievedHandler, DailyBonusHandler,
    DaysOffStartedHandler, DeviceRegisteredHandler, EventHandler, HandlerContext,
    LevelCompletedHandler, NewsPublishedHandler, PingDueHandler, RoleEnabledHandler,
    UserCreatedHandler,
};

pub struct ConsumerRouter {
    engine: Arc<DispatchEngine>,
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

pub struct ConsumerRouterBuilder {
    engine: Arc<DispatchEngine>,
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
    duplicates: Vec<EventKind>,
}

impl ConsumerRouterBuilder {
    pub fn register(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        if self.handlers.insert(kind, handler).is_some() {
            self.duplicates.push(kind);
        }
        self
    }

    /// Fails when a kind was registered twice or not at all.
    pub fn build(self) -> Result<ConsumerRouter, AppError> {
        if !self.duplicates.is_empty() {
            return Err(AppError::Config(format!(
                "duplicate handlers registered for: {}",
                join_kinds(&self.duplicates)
            )));
        }

        let missing: Vec<EventKind> = EventKind::ALL
            .into_iter()
            .filter(|kind| !self.handlers.contains_key(kind))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "no handler registered for: {}",
                join_kinds(&missing)
            )));
        }

        Ok(ConsumerRouter {
            engine: self.engine,
            handlers: self.handlers,
        })
    }
}

fn join_kinds(kinds: &[EventKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConsumerRouter {
    pub fn builder(engine: Arc<DispatchEngine>) -> ConsumerRouterBuilder {
        ConsumerRouterBuilder {
            engine,
            handlers: HashMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// The production registry: one handler per event kind.
    pub fn standard(engine: Arc<DispatchEngine>, ctx: HandlerContext) -> Result<Self, AppError> {
        Self::builder(engine)
            .register(
                EventKind::UserCreated,
                Arc::new(UserCreatedHandler::new(ctx.clone())),
            )
            .register(
                EventKind::DeviceRegistered,
                Arc::new(DeviceRegisteredHandler::new(ctx.clone())),
            )
            .register(
                EventKind::DailyBonusAvailable,
                Arc::new(DailyBonusHandler::new(ctx.clone())),
            )
            .register(EventKind::PingDue, Arc::new(PingDueHandler::new(ctx.clone())))
            .register(
                EventKind::DaysOffStarted,
                Arc::new(DaysOffStartedHandler::new(ctx.clone())),
            )
            .register(
                EventKind::BadgeAchieved,
                Arc::new(BadgeAchievedHandler::new(ctx.clone())),
            )
            .register(
                EventKind::LevelCompleted,
                Arc::new(LevelCompletedHandler::new(ctx.clone())),
            )
            .register(
                EventKind::RoleEnabled,
                Arc::new(RoleEnabledHandler::new(ctx.clone())),
            )
            .register(
                EventKind::AgendaContactAdded,
                Arc::new(AgendaContactAddedHandler::new(ctx.clone())),
            )
            .register(
                EventKind::NewsPublished,
                Arc::new(NewsPublishedHandler::new(ctx.clone())),
            )
            .register(
                EventKind::AdoptionChanged,
                Arc::new(AdoptionChangedHandler::new(ctx)),
            )
            .build()
    }

    /// Run the event's handler and dispatch whatever it decided to send.
    pub async fn route(
        &self,
        cancel: &CancellationToken,
        event: Event,
    ) -> Result<DispatchSummary, AppError> {
        let kind = event.kind();
        let occurred_at = event.occurred_at();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| AppError::Internal(format!("no handler for {kind}")))?;

        let intents = handler.handle(&event).await?;
        if intents.is_empty() {
            tracing::debug!(event = %kind, user_id = ?event.user_id(), "Nothing to notify");
            return Ok(DispatchSummary::default());
        }

        let summary = self.engine.dispatch(cancel, intents).await?;
        tracing::debug!(
            event = %kind,
            %occurred_at,
            sent = summary.sent,
            skipped = summary.skipped,
            "Event routed"
        );
        Ok(summary)
    }

    /// Route a batch of events concurrently, one task per event.
    pub async fn route_batch(
        self: &Arc<Self>,
        cancel: &CancellationToken,
        events: Vec<Event>,
    ) -> Result<DispatchSummary, AppError> {
        let summaries = run_concurrently(
            cancel,
            events,
            |ix, event| format!("event[{ix}] {}", event.kind()),
            |event| {
                let router = Arc::clone(self);
                let cancel = cancel.clone();
                async move { router.route(&cancel, event).await }
            },
        )
        .await?;

        Ok(summaries
            .into_iter()
            .fold(DispatchSummary::default(), DispatchSummary::merge))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use herald_common::config::DisabledAchievementNotifications;
    use herald_common::types::{BadgeAchieved, LevelCompleted, NotificationIntent, PingDue};

    use super::*;
    use crate::handlers::test_support::context_with_user;
    use crate::ledger::InMemorySentRecordStore;
    use crate::testing::RecordingSender;

    struct Silent;

    #[async_trait]
    impl EventHandler for Silent {
        async fn handle(&self, _event: &Event) -> Result<Vec<NotificationIntent>, AppError> {
            Ok(Vec::new())
        }
    }

    fn engine(sender: &Arc<RecordingSender>) -> Arc<DispatchEngine> {
        Arc::new(DispatchEngine::new(
            Arc::new(InMemorySentRecordStore::new()),
            sender.clone(),
        ))
    }

    fn badge(name: &str) -> Event {
        Event::BadgeAchieved(BadgeAchieved {
            user_id: "u-1".to_string(),
            badge: name.to_string(),
            group: "social".to_string(),
            achieved_at: Utc::now(),
        })
    }

    #[test]
    fn test_missing_handler_fails_build() {
        let sender = Arc::new(RecordingSender::new());
        let result = ConsumerRouter::builder(engine(&sender))
            .register(EventKind::PingDue, Arc::new(Silent))
            .build();

        match result {
            Err(AppError::Config(msg)) => {
                assert!(msg.contains("user_created"));
                assert!(!msg.contains("ping_due"));
            }
            _ => panic!("expected a config error"),
        }
    }

    #[test]
    fn test_duplicate_handler_fails_build() {
        let sender = Arc::new(RecordingSender::new());
        let mut builder = ConsumerRouter::builder(engine(&sender));
        for kind in EventKind::ALL {
            builder = builder.register(kind, Arc::new(Silent));
        }
        let result = builder
            .register(EventKind::NewsPublished, Arc::new(Silent))
            .build();

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("news_published")));
    }

    #[tokio::test]
    async fn test_standard_router_covers_every_kind() {
        let sender = Arc::new(RecordingSender::new());
        let ctx = context_with_user(DisabledAchievementNotifications::default()).await;
        assert!(ConsumerRouter::standard(engine(&sender), ctx).is_ok());
    }

    #[tokio::test]
    async fn test_replayed_event_is_delivered_once() {
        let sender = Arc::new(RecordingSender::new());
        let ctx = context_with_user(DisabledAchievementNotifications::default()).await;
        let router = ConsumerRouter::standard(engine(&sender), ctx).unwrap();
        let cancel = CancellationToken::new();

        let first = router.route(&cancel, badge("Gold")).await.unwrap();
        assert_eq!(first, DispatchSummary { sent: 2, skipped: 0 });

        let replay = router.route(&cancel, badge("gold")).await.unwrap();
        assert_eq!(replay, DispatchSummary { sent: 0, skipped: 2 });
        assert_eq!(sender.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_batch_reports_failures_per_event() {
        let sender = Arc::new(RecordingSender::failing_for(&["token-1"]));
        let ctx = context_with_user(DisabledAchievementNotifications::default()).await;
        let router = Arc::new(ConsumerRouter::standard(engine(&sender), ctx).unwrap());

        let events = vec![
            Event::PingDue(PingDue {
                user_id: "ghost".to_string(),
                pinged_by: "bob".to_string(),
                pinged_at: Utc::now(),
            }),
            Event::LevelCompleted(LevelCompleted {
                user_id: "u-1".to_string(),
                level: "L3".to_string(),
                completed_at: Utc::now(),
            }),
        ];

        let err = router
            .route_batch(&CancellationToken::new(), events)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("event[1] level_completed"), "{msg}");
        assert!(msg.contains("push:token-1"), "{msg}");
        assert!(!msg.contains("event[0]"), "{msg}");

        // The in-app branch of the failing event still went out.
        assert_eq!(sender.destinations(), vec!["u-1".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_batch_routes_nothing() {
        let sender = Arc::new(RecordingSender::new());
        let ctx = context_with_user(DisabledAchievementNotifications::default()).await;
        let router = Arc::new(ConsumerRouter::standard(engine(&sender), ctx).unwrap());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = router
            .route_batch(&cancel, vec![badge("Gold")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled(_)));
        assert_eq!(sender.sent_count(), 0);
    }
}
