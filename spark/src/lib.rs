//! Client-side data fetching: a request executor, a retrying read path with a
//! deduplicating query cache, and a mutation runner that invalidates cached
//! reads once a write is confirmed.

pub mod client;
pub mod domain;
pub mod events;
pub mod executor;
pub mod planes;
pub mod ports;

#[cfg(test)]
mod testing;

pub use client::{CachedValue, QueryClient, QueryClientConfig};
pub use domain::{
    CacheEntry, FormPart, Method, OutgoingBody, PreparedRequest, RawResponse, RequestBody,
    ResourceKey, ResourceRequest,
};
pub use events::CacheEvent;
pub use executor::RequestExecutor;
pub use planes::mutation::{MutationOptions, MutationRunner};
pub use planes::query::{
    QueryCache, QueryCacheSettings, QueryOptions, RetryPolicy, UnauthorizedBehavior,
};
pub use ports::{EntryStore, Transport, TransportError};
