use crate::sessions::SessionStore;
use crate::storage::{MemStorage, Storage};
use shared::config::ServerConfig;
use std::sync::Arc;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub sessions: SessionStore,
}

impl AppState {
    /// Fresh in-memory state.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_storage(Arc::new(MemStorage::new()), config)
    }

    pub fn with_storage(storage: Arc<dyn Storage>, config: &ServerConfig) -> Self {
        Self {
            storage,
            sessions: SessionStore::new(config.session_ttl),
        }
    }
}
