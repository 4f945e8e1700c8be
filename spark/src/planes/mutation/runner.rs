use crate::domain::{ResourceKey, ResourceRequest};
use crate::executor::{decode, RequestExecutor};
use crate::planes::query::QueryCache;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use shared::FetchResult;
use tracing::debug;

/// Cache prefixes a write makes stale once it succeeds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationOptions {
    pub invalidates: Vec<ResourceKey>,
}

impl MutationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(mut self, prefix: impl Into<ResourceKey>) -> Self {
        self.invalidates.push(prefix.into());
        self
    }

    pub fn invalidating<I>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = ResourceKey>,
    {
        Self {
            invalidates: prefixes.into_iter().collect(),
        }
    }
}

/// Runs state-changing calls. One attempt per call and no deduplication;
/// declared prefixes are invalidated only after a 2xx.
pub struct MutationRunner<V> {
    executor: RequestExecutor,
    cache: QueryCache<V>,
}

impl<V> Clone for MutationRunner<V> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<V> MutationRunner<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(executor: RequestExecutor, cache: QueryCache<V>) -> Self {
        Self { executor, cache }
    }

    /// Sends `request` once and returns the raw success body.
    pub async fn run_raw(
        &self,
        request: &ResourceRequest,
        options: &MutationOptions,
    ) -> FetchResult<Bytes> {
        let body = match self.executor.execute_raw(request).await {
            Ok(body) => body,
            Err(failure) => {
                debug!("Mutation {} {} failed: {}", request.method, request.path, failure);
                return Err(failure);
            }
        };

        if !options.invalidates.is_empty() {
            let marked = self.cache.invalidate(&options.invalidates);
            debug!("Mutation {} {} invalidated {} entries", request.method, request.path, marked);
        }
        Ok(body)
    }

    /// Sends `request` once and decodes the success body.
    ///
    /// Invalidation follows the server's confirmation, so a body that fails
    /// to decode still leaves the declared prefixes stale.
    pub async fn run<T: DeserializeOwned>(
        &self,
        request: &ResourceRequest,
        options: &MutationOptions,
    ) -> FetchResult<T> {
        let body = self.run_raw(request, options).await?;
        decode(&body)
    }
}

impl<V> std::fmt::Debug for MutationRunner<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationRunner")
            .field("executor", &self.executor)
            .finish()
    }
}
