use std::sync::Arc;

use crate::config::ServerConfig;
use crate::processors::Processors;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: helphub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Event bus handlers publish request and payment events on.
    pub event_bus: Arc<helphub_events::EventBus>,
    /// Outbound payment processor clients (absent when not configured).
    pub processors: Arc<Processors>,
}
