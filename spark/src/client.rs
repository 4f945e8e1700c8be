use crate::domain::{ResourceKey, ResourceRequest};
use crate::events::CacheEvent;
use crate::executor::RequestExecutor;
use crate::planes::mutation::{MutationOptions, MutationRunner};
use crate::planes::query::{QueryCache, QueryCacheSettings, QueryOptions, RetryPolicy};
use crate::ports::{EntryStore, Transport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::config::ClientConfig;
use shared::{Failure, FetchResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// What the cache holds: decoded JSON, shared between waiters.
pub type CachedValue = Arc<Value>;

#[derive(Clone, Copy, Debug, Default)]
pub struct QueryClientConfig {
    pub retry: RetryPolicy,
    /// Off by default: regaining focus never refetches unless asked to.
    pub refetch_on_window_focus: bool,
    pub stale_after: Option<Duration>,
}

impl From<&ClientConfig> for QueryClientConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            retry: RetryPolicy::new(config.retry_attempts, config.retry_delay),
            refetch_on_window_focus: config.refetch_on_window_focus,
            stale_after: config.stale_after,
        }
    }
}

/// Entry point for UI call sites: cached reads, writes with invalidation,
/// and the cache lifecycle. Cheap to clone; clones share one cache.
#[derive(Clone)]
pub struct QueryClient {
    executor: RequestExecutor,
    cache: QueryCache<CachedValue>,
    mutations: MutationRunner<CachedValue>,
    config: QueryClientConfig,
}

impl QueryClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn EntryStore<CachedValue>>,
        config: QueryClientConfig,
    ) -> Self {
        let cache = QueryCache::new(store, Self::cache_settings(&config));
        Self::assemble(transport, cache, config)
    }

    pub fn with_event_broadcaster(
        transport: Arc<dyn Transport>,
        store: Arc<dyn EntryStore<CachedValue>>,
        config: QueryClientConfig,
        broadcaster: broadcast::Sender<CacheEvent>,
    ) -> Self {
        let cache =
            QueryCache::with_event_broadcaster(store, Self::cache_settings(&config), broadcaster);
        Self::assemble(transport, cache, config)
    }

    fn cache_settings(config: &QueryClientConfig) -> QueryCacheSettings {
        QueryCacheSettings {
            retry: config.retry,
            stale_after: config.stale_after,
        }
    }

    fn assemble(
        transport: Arc<dyn Transport>,
        cache: QueryCache<CachedValue>,
        config: QueryClientConfig,
    ) -> Self {
        let executor = RequestExecutor::new(transport);
        let mutations = MutationRunner::new(executor.clone(), cache.clone());
        info!(
            "Query client ready (max {} attempts, refetch on focus: {})",
            config.retry.max_attempts(),
            config.refetch_on_window_focus
        );
        Self {
            executor,
            cache,
            mutations,
            config,
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn cache(&self) -> &QueryCache<CachedValue> {
        &self.cache
    }

    pub fn config(&self) -> &QueryClientConfig {
        &self.config
    }

    /// Cached read addressed by the key itself (`GET key.to_path()`).
    pub async fn query<T: DeserializeOwned>(
        &self,
        key: &ResourceKey,
        options: QueryOptions,
    ) -> FetchResult<Option<T>> {
        self.query_request(key, ResourceRequest::get(key.to_path()), options)
            .await
    }

    /// Cached read of `request`, stored under `key`.
    pub async fn query_request<T: DeserializeOwned>(
        &self,
        key: &ResourceKey,
        request: ResourceRequest,
        options: QueryOptions,
    ) -> FetchResult<Option<T>> {
        let executor = self.executor.clone();
        let value = self
            .cache
            .fetch(key, options, move || {
                let executor = executor.clone();
                let request = request.clone();
                async move { executor.execute::<Value>(&request).await.map(Arc::new) }
            })
            .await?;

        value.map(|value| from_cached(&value)).transpose()
    }

    pub async fn mutate<T: DeserializeOwned>(
        &self,
        request: &ResourceRequest,
        options: &MutationOptions,
    ) -> FetchResult<T> {
        self.mutations.run(request, options).await
    }

    pub fn invalidate(&self, prefixes: &[ResourceKey]) -> usize {
        self.cache.invalidate(prefixes)
    }

    /// Called by the host when its window regains focus. Marks everything
    /// stale only when `refetch_on_window_focus` is set.
    pub fn window_focused(&self) -> usize {
        if !self.config.refetch_on_window_focus {
            debug!("Window focused, refetch on focus disabled");
            return 0;
        }
        self.cache.invalidate_all()
    }

    /// Session end: drops every entry.
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn set_query_data<T: Serialize>(&self, key: ResourceKey, value: &T) -> FetchResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| Failure::unknown(format!("failed to encode cached value: {e}")))?;
        self.cache.set_data(key, Arc::new(value));
        Ok(())
    }

    /// Last known value for `key`, fresh or stale, without fetching.
    pub fn query_data<T: DeserializeOwned>(&self, key: &ResourceKey) -> FetchResult<Option<T>> {
        self.cache
            .get_data(key)
            .map(|value| from_cached(&value))
            .transpose()
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<CacheEvent>> {
        self.cache.subscribe()
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

fn from_cached<T: DeserializeOwned>(value: &Value) -> FetchResult<T> {
    <T as Deserialize>::deserialize(value)
        .map_err(|e| Failure::unknown(format!("cached value has unexpected shape: {e}")))
}
