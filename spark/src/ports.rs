#![deny(clippy::all)]

use crate::domain::{CacheEntry, PreparedRequest, RawResponse, ResourceKey};
use async_trait::async_trait;
use shared::Failure;

// Ports are the pluggable seams between the fetch layer and the outside world

/// Port for sending one prepared request over the wire (e.g., reqwest)
///
/// Implementations attach the caller's session credential (cookie jar or
/// equivalent) to every request, whatever its method.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// A request that never produced a status line.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    /// The request could not be built (bad header, URL or form part).
    #[error("invalid request: {0}")]
    Request(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Request(_) => Failure::unknown(err.to_string()).into_permanent(),
            _ => Failure::transient(err.to_string()),
        }
    }
}

/// Port for the storage behind the query cache (e.g., moka)
///
/// Calls are synchronous so the cache can check an entry and register an
/// in-flight read without yielding in between.
pub trait EntryStore<V>: Send + Sync + 'static {
    fn get(&self, key: &ResourceKey) -> Option<CacheEntry<V>>;
    fn insert(&self, key: ResourceKey, entry: CacheEntry<V>);
    /// Marks every entry under `prefix` stale and returns the affected keys.
    fn mark_stale(&self, prefix: &ResourceKey) -> Vec<ResourceKey>;
    fn clear(&self);
    fn entry_count(&self) -> u64;
}
