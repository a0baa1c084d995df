//! Shared application state for the Axum API server.

use herald_common::health::HealthProbe;
use herald_engine::news::NewsRepository;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub probe: HealthProbe,
    pub news: NewsRepository,
}

impl AppState {
    pub fn new(probe: HealthProbe, news: NewsRepository) -> Self {
        Self { probe, news }
    }
}
