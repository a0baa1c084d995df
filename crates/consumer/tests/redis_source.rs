//! Integration tests for the Redis event source.
//!
//! Requires a running Redis.
//!
//! ```bash
//! REDIS_URL="redis://localhost:6379" \
//!   cargo test -p herald-consumer --test redis_source -- --ignored --nocapture
//! ```

use chrono::Utc;

use herald_common::bus::EventBus;
use herald_common::types::{BadgeAchieved, Event};
use herald_consumer::consumer::decode_batch;
use herald_consumer::source::{EventSource, RedisEventSource};

const QUEUE: &str = "herald:events:test";

async fn connect() -> EventBus {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    EventBus::connect(&redis_url).await.unwrap()
}

fn badge(name: &str) -> Event {
    Event::BadgeAchieved(BadgeAchieved {
        user_id: "u-1".to_string(),
        badge: name.to_string(),
        group: "social".to_string(),
        achieved_at: Utc::now(),
    })
}

#[tokio::test]
#[ignore]
async fn test_published_events_pop_oldest_first() {
    let bus = connect().await;
    let source = RedisEventSource::new(bus.clone(), QUEUE);
    // Drain leftovers from earlier runs.
    while !source.pop_batch(100).await.unwrap().is_empty() {}

    for name in ["Gold", "Silver", "Bronze"] {
        bus.publish(QUEUE, &badge(name)).await.unwrap();
    }

    let first = decode_batch(source.pop_batch(2).await.unwrap());
    let second = decode_batch(source.pop_batch(2).await.unwrap());
    assert_eq!(first.len(), 2);
    assert!(source.pop_batch(2).await.unwrap().is_empty());

    let badges: Vec<String> = first
        .into_iter()
        .chain(second)
        .map(|event| match event {
            Event::BadgeAchieved(e) => e.badge,
            other => panic!("unexpected event {:?}", other.kind()),
        })
        .collect();
    assert_eq!(badges, ["Gold", "Silver", "Bronze"]);
}
