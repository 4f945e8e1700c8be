use super::operation::{QueryOptions, UnauthorizedBehavior};
use super::retry::RetryPolicy;
use crate::domain::{CacheEntry, ResourceKey};
use crate::events::{
    self, now_timestamp, CacheClearedEvent, CacheEvent, EntryInvalidatedEvent, EntryPopulatedEvent,
};
use crate::ports::EntryStore;
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use shared::{Failure, FetchResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, trace};

/// In-flight request token. Every waiter on a key polls the same receiver,
/// so they all observe one outcome.
type InFlightToken<V> = Shared<oneshot::Receiver<FetchResult<V>>>;

struct InFlight<V> {
    id: u64,
    token: InFlightToken<V>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct QueryCacheSettings {
    /// Default retry policy; `QueryOptions::max_attempts` overrides the ceiling.
    pub retry: RetryPolicy,
    /// Optional age limit for entries. None keeps them fresh until invalidated.
    pub stale_after: Option<Duration>,
}

struct Inner<V> {
    store: Arc<dyn EntryStore<V>>,
    in_flight: Mutex<HashMap<ResourceKey, InFlight<V>>>,
    next_id: AtomicU64,
    settings: QueryCacheSettings,
    event_broadcaster: Option<broadcast::Sender<CacheEvent>>,
}

/// Keyed read cache with request deduplication.
///
/// Entry lookups and in-flight registration happen in one critical section
/// with no suspension point, so concurrent reads of a key start one fetch.
/// Fetches run on their own task: a caller that stops waiting does not cancel
/// the fetch for anyone else.
pub struct QueryCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

enum Lookup<V> {
    Fresh(V),
    Waiting(InFlightToken<V>),
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(store: Arc<dyn EntryStore<V>>, settings: QueryCacheSettings) -> Self {
        Self::build(store, settings, None)
    }

    pub fn with_event_broadcaster(
        store: Arc<dyn EntryStore<V>>,
        settings: QueryCacheSettings,
        broadcaster: broadcast::Sender<CacheEvent>,
    ) -> Self {
        Self::build(store, settings, Some(broadcaster))
    }

    fn build(
        store: Arc<dyn EntryStore<V>>,
        settings: QueryCacheSettings,
        event_broadcaster: Option<broadcast::Sender<CacheEvent>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                in_flight: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                settings,
                event_broadcaster,
            }),
        }
    }

    pub fn settings(&self) -> &QueryCacheSettings {
        &self.inner.settings
    }

    /// Returns the fresh cached value for `key`, joins the read already in
    /// flight for it, or starts `fetcher` under the retry policy.
    ///
    /// `Ok(None)` is only produced for an unauthorized failure when the call
    /// site asked for [`UnauthorizedBehavior::ReturnNone`]; that outcome is
    /// not cached.
    pub async fn fetch<F, Fut>(
        &self,
        key: &ResourceKey,
        options: QueryOptions,
        fetcher: F,
    ) -> FetchResult<Option<V>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let token = match self.lookup_or_start(key, options, fetcher) {
            Lookup::Fresh(value) => return Ok(Some(value)),
            Lookup::Waiting(token) => token,
        };

        let outcome = token
            .await
            .unwrap_or_else(|_| Err(Failure::unknown("read ended without a result")));
        resolve(outcome, options.on_unauthorized)
    }

    fn lookup_or_start<F, Fut>(&self, key: &ResourceKey, options: QueryOptions, fetcher: F) -> Lookup<V>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let mut in_flight = self.inner.in_flight.lock();

        if let Some(entry) = self.inner.store.get(key) {
            if entry.is_fresh(self.inner.settings.stale_after) {
                trace!("Cache hit for {}", key);
                return Lookup::Fresh(entry.value);
            }
        }

        if let Some(existing) = in_flight.get(key) {
            debug!("Joining in-flight read for {}", key);
            return Lookup::Waiting(existing.token.clone());
        }

        let policy = match options.max_attempts {
            Some(max_attempts) => self.inner.settings.retry.with_max_attempts(max_attempts),
            None => self.inner.settings.retry,
        };
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        let token = receiver.shared();
        in_flight.insert(
            key.clone(),
            InFlight {
                id,
                token: token.clone(),
            },
        );
        debug!("Starting read for {} (max {} attempts)", key, policy.max_attempts());
        self.spawn_fetch(key.clone(), id, policy, fetcher, sender);

        Lookup::Waiting(token)
    }

    fn spawn_fetch<F, Fut>(
        &self,
        key: ResourceKey,
        id: u64,
        policy: RetryPolicy,
        mut fetcher: F,
        sender: oneshot::Sender<FetchResult<V>>,
    ) where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let guard = SettleGuard {
                inner: Arc::clone(&inner),
                key: key.clone(),
                id,
            };
            let outcome = policy
                .run(|attempt| {
                    trace!("Fetching {} (attempt {})", key, attempt);
                    fetcher()
                })
                .await;
            inner.settle(&key, id, &outcome);
            drop(guard);
            // Waiters may all be gone; the outcome is simply dropped then.
            sender.send(outcome).ok();
        });
    }

    /// Marks every entry under any of `prefixes` stale and detaches matching
    /// in-flight reads. Returns the number of entries marked.
    pub fn invalidate(&self, prefixes: &[ResourceKey]) -> usize {
        let mut marked = Vec::new();
        {
            let mut in_flight = self.inner.in_flight.lock();
            for prefix in prefixes {
                marked.extend(self.inner.store.mark_stale(prefix));

                let before = in_flight.len();
                in_flight.retain(|key, _| !key.starts_with(prefix));
                let detached = before - in_flight.len();
                if detached > 0 {
                    debug!("Detached {} in-flight read(s) under {}", detached, prefix);
                }
            }
        }

        marked.sort();
        marked.dedup();
        for key in &marked {
            events::publish(
                self.inner.event_broadcaster.as_ref(),
                CacheEvent::Invalidated(EntryInvalidatedEvent {
                    key: key.clone(),
                    timestamp: now_timestamp(),
                }),
            );
        }
        debug!("Invalidated {} entries", marked.len());
        marked.len()
    }

    pub fn invalidate_all(&self) -> usize {
        self.invalidate(&[ResourceKey::root()])
    }

    /// Drops every entry and detaches every in-flight read.
    pub fn clear(&self) {
        {
            let mut in_flight = self.inner.in_flight.lock();
            in_flight.clear();
            self.inner.store.clear();
        }
        debug!("Query cache cleared");
        events::publish(
            self.inner.event_broadcaster.as_ref(),
            CacheEvent::Cleared(CacheClearedEvent {
                timestamp: now_timestamp(),
            }),
        );
    }

    /// Stores `value` as the fresh entry for `key`. A read in flight for the
    /// key is detached so it cannot overwrite the value.
    pub fn set_data(&self, key: ResourceKey, value: V) {
        {
            let mut in_flight = self.inner.in_flight.lock();
            in_flight.remove(&key);
            self.inner.store.insert(key.clone(), CacheEntry::new(value));
        }
        events::publish(
            self.inner.event_broadcaster.as_ref(),
            CacheEvent::Populated(EntryPopulatedEvent {
                key,
                timestamp: now_timestamp(),
            }),
        );
    }

    /// Last known value for `key`, fresh or not.
    pub fn get_data(&self, key: &ResourceKey) -> Option<V> {
        self.inner.store.get(key).map(|entry| entry.value)
    }

    pub fn entry(&self, key: &ResourceKey) -> Option<CacheEntry<V>> {
        self.inner.store.get(key)
    }

    pub fn is_fetching(&self, key: &ResourceKey) -> bool {
        self.inner.in_flight.lock().contains_key(key)
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.store.entry_count()
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<CacheEvent>> {
        self.inner.event_broadcaster.as_ref().map(|tx| tx.subscribe())
    }
}

impl<V> Inner<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Records a settled read. Only the read still registered under `key`
    /// may populate the entry; detached reads just hand their outcome to
    /// their own waiters.
    fn settle(&self, key: &ResourceKey, id: u64, outcome: &FetchResult<V>) {
        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.get(key).is_some_and(|f| f.id == id) {
                debug!("Read for {} was detached, result not cached", key);
                return;
            }
            in_flight.remove(key);

            let Ok(value) = outcome else {
                return;
            };
            self.store.insert(key.clone(), CacheEntry::new(value.clone()));
        }

        events::publish(
            self.event_broadcaster.as_ref(),
            CacheEvent::Populated(EntryPopulatedEvent {
                key: key.clone(),
                timestamp: now_timestamp(),
            }),
        );
    }
}

/// Removes the token if the fetch task ends without settling (e.g. panics).
struct SettleGuard<V> {
    inner: Arc<Inner<V>>,
    key: ResourceKey,
    id: u64,
}

impl<V> Drop for SettleGuard<V> {
    fn drop(&mut self) {
        let mut in_flight = self.inner.in_flight.lock();
        if in_flight.get(&self.key).is_some_and(|f| f.id == self.id) {
            in_flight.remove(&self.key);
        }
    }
}

fn resolve<V>(outcome: FetchResult<V>, behavior: UnauthorizedBehavior) -> FetchResult<Option<V>> {
    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(failure)
            if failure.is_unauthorized() && behavior == UnauthorizedBehavior::ReturnNone =>
        {
            debug!("Unauthorized read resolved with no value");
            Ok(None)
        }
        Err(failure) => Err(failure),
    }
}

impl<V: 'static> std::fmt::Debug for QueryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entry_count", &self.inner.store.entry_count())
            .field("in_flight", &self.inner.in_flight.lock().len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}
