//! Shared application state for the Axum API server.

use std::sync::Arc;

use pushgate_common::config::AppConfig;
use pushgate_common::stats::StatStore;
use pushgate_engine::Dispatcher;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, config: Arc<AppConfig>) -> Self {
        Self { dispatcher, config }
    }

    pub fn stats(&self) -> &Arc<dyn StatStore> {
        self.dispatcher.stats()
    }
}
