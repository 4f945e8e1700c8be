use crate::domain::ResourceKey;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Populated(EntryPopulatedEvent),
    Invalidated(EntryInvalidatedEvent),
    Cleared(CacheClearedEvent),
}

impl CacheEvent {
    pub fn key(&self) -> Option<&ResourceKey> {
        match self {
            CacheEvent::Populated(e) => Some(&e.key),
            CacheEvent::Invalidated(e) => Some(&e.key),
            CacheEvent::Cleared(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::Populated(_) => "populated",
            CacheEvent::Invalidated(_) => "invalidated",
            CacheEvent::Cleared(_) => "cleared",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryPopulatedEvent {
    pub key: ResourceKey,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryInvalidatedEvent {
    pub key: ResourceKey,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheClearedEvent {
    pub timestamp: u64,
}

/// Helper to get current timestamp in seconds since UNIX epoch
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Sends `event` if a broadcaster is configured. Having no subscriber is not an error.
pub(crate) fn publish(broadcaster: Option<&broadcast::Sender<CacheEvent>>, event: CacheEvent) {
    let Some(broadcaster) = broadcaster else {
        return;
    };
    let kind = event.kind();
    match broadcaster.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!("Broadcasted {} event to {} subscriber(s)", kind, subscriber_count);
        }
        Err(_) => {
            tracing::trace!("No subscribers for {} event", kind);
        }
    }
}
