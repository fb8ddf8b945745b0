use crate::config::ServerConfig;
use backmon_storage::Storage;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}
