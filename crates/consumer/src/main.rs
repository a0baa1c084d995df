use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use herald_common::bus::EventBus;
use herald_common::config::AppConfig;
use herald_common::db;
use herald_consumer::consumer::EventConsumer;
use herald_consumer::source::RedisEventSource;
use herald_engine::directory::PgRecipientDirectory;
use herald_engine::dispatch::DispatchEngine;
use herald_engine::handlers::HandlerContext;
use herald_engine::ledger::{PgSentRecordStore, SentRecordStore};
use herald_engine::router::ConsumerRouter;
use herald_engine::sweeper::RetentionSweeper;
use herald_engine::templates::Templates;
use herald_notifier::ChannelSenders;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "herald_consumer=info,herald_engine=info,herald_notifier=info".into()
            }),
        )
        .json()
        .init();

    tracing::info!("Herald consumer starting...");

    let config = Arc::new(AppConfig::from_env()?);

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let bus = EventBus::connect(&config.redis_url).await?;

    let ledger: Arc<dyn SentRecordStore> = Arc::new(PgSentRecordStore::new(pool.clone()));
    let senders = Arc::new(ChannelSenders::from_config(&config, &bus));
    let engine = Arc::new(DispatchEngine::new(ledger.clone(), senders));

    let ctx = HandlerContext::new(
        config.clone(),
        Arc::new(PgRecipientDirectory::new(pool)),
        Arc::new(Templates::builtin()),
    );
    let router = Arc::new(ConsumerRouter::standard(engine, ctx)?);

    let cancel = CancellationToken::new();
    let sweeper = RetentionSweeper::new(ledger).spawn(cancel.clone());

    let consumer = EventConsumer::new(
        RedisEventSource::new(bus, config.event_queue.clone()),
        router,
        config.consumer_batch_size,
        config.consumer_poll_interval_ms,
    );

    tracing::info!(queue = %config.event_queue, "Consuming events");

    // Run until Ctrl+C, then let the in-flight batch settle
    consumer
        .run_until(cancel.clone(), async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await;

    cancel.cancel();
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Retention sweeper task failed");
    }

    tracing::info!("Herald consumer stopped.");
    Ok(())
}
