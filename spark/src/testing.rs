//! In-crate fakes for the two ports.

use crate::domain::{CacheEntry, PreparedRequest, RawResponse, ResourceKey};
use crate::ports::{EntryStore, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

type Scripted = Result<RawResponse, TransportError>;

/// Replays scripted responses per path and counts calls.
///
/// Each call pops the next response for its path; the last one repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<PreparedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, path: &str, responses: Vec<Scripted>) {
        self.scripts
            .lock()
            .insert(path.to_string(), responses.into_iter().collect());
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.path == path).count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<PreparedRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let path = request.path.clone();
        self.requests.lock().push(request);

        let mut scripts = self.scripts.lock();
        let Some(queue) = scripts.get_mut(&path) else {
            return Ok(RawResponse::new(404, r#"{"message":"no script"}"#));
        };
        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("empty script".into())))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Other("empty script".into())))
        }
    }
}

/// HashMap-backed store.
pub struct MapEntryStore<V> {
    entries: Mutex<HashMap<ResourceKey, CacheEntry<V>>>,
}

impl<V> MapEntryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> EntryStore<V> for MapEntryStore<V> {
    fn get(&self, key: &ResourceKey) -> Option<CacheEntry<V>> {
        self.entries.lock().get(key).cloned()
    }

    fn insert(&self, key: ResourceKey, entry: CacheEntry<V>) {
        self.entries.lock().insert(key, entry);
    }

    fn mark_stale(&self, prefix: &ResourceKey) -> Vec<ResourceKey> {
        let mut entries = self.entries.lock();
        let mut marked = Vec::new();
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                *entry = entry.to_stale();
                marked.push(key.clone());
            }
        }
        marked
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn entry_count(&self) -> u64 {
        self.entries.lock().len() as u64
    }
}
