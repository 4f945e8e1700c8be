use moka::sync::Cache;
use spark::domain::{CacheEntry, ResourceKey};
use spark::ports::EntryStore;
use std::fmt::Debug;
use tracing::trace;

/// Moka-backed entry store for the query cache.
/// Entries never expire on their own; staleness is driven by invalidation.
pub struct MokaEntryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<ResourceKey, CacheEntry<V>>,
}

impl<V> MokaEntryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a new unbounded store
    pub fn new_unbounded() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    /// Create a named store with an optional entry bound.
    /// Evicted entries are simply fetched again on their next read.
    pub fn new(name: &str, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(name);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }
}

impl<V> Default for MokaEntryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new_unbounded()
    }
}

impl<V> EntryStore<V> for MokaEntryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &ResourceKey) -> Option<CacheEntry<V>> {
        self.cache.get(key)
    }

    fn insert(&self, key: ResourceKey, entry: CacheEntry<V>) {
        self.cache.insert(key, entry);
    }

    fn mark_stale(&self, prefix: &ResourceKey) -> Vec<ResourceKey> {
        let matching: Vec<(ResourceKey, CacheEntry<V>)> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| ((*key).clone(), entry))
            .collect();

        let mut marked = Vec::with_capacity(matching.len());
        for (key, entry) in matching {
            self.cache.insert(key.clone(), entry.to_stale());
            marked.push(key);
        }
        trace!("Marked {} entries stale under {}", marked.len(), prefix);
        marked
    }

    fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    fn entry_count(&self) -> u64 {
        // Moka updates its counters lazily
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl<V> Debug for MokaEntryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaEntryStore")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Failure;
    use spark::{QueryCache, QueryCacheSettings, QueryOptions};
    use std::sync::Arc;

    fn key(parts: &[&str]) -> ResourceKey {
        ResourceKey::new(parts.iter().copied())
    }

    #[tokio::test]
    async fn test_moka_store_insert_and_get() {
        let store = MokaEntryStore::new("test", None);

        let documents = key(&["/api/users", "1", "documents"]);
        store.insert(documents.clone(), CacheEntry::new(vec!["a.pdf"]));

        let entry = store.get(&documents).unwrap();
        assert!(entry.fresh);
        assert_eq!(entry.value, vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn test_moka_store_get_nonexistent() {
        let store: MokaEntryStore<u32> = MokaEntryStore::new_unbounded();
        assert!(store.get(&key(&["/api/quizzes", "1"])).is_none());
    }

    #[tokio::test]
    async fn test_moka_store_overwrite() {
        let store = MokaEntryStore::new_unbounded();
        let quiz = key(&["/api/quizzes", "1"]);

        store.insert(quiz.clone(), CacheEntry::new("value1"));
        store.insert(quiz.clone(), CacheEntry::new("value2"));

        assert_eq!(store.get(&quiz).unwrap().value, "value2");
        assert_eq!(store.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_moka_store_mark_stale_by_prefix() {
        let store = MokaEntryStore::new_unbounded();
        let documents = key(&["/api/users", "1", "documents"]);
        let decks = key(&["/api/users", "1", "flashcard-decks"]);
        let other_user = key(&["/api/users", "2", "documents"]);
        let quiz = key(&["/api/quizzes", "1"]);
        for k in [&documents, &decks, &other_user, &quiz] {
            store.insert(k.clone(), CacheEntry::new(1u32));
        }

        let mut marked = store.mark_stale(&key(&["/api/users", "1"]));
        marked.sort();

        assert_eq!(marked, vec![documents.clone(), decks.clone()]);
        assert!(!store.get(&documents).unwrap().fresh);
        assert!(!store.get(&decks).unwrap().fresh);
        assert!(store.get(&other_user).unwrap().fresh);
        assert!(store.get(&quiz).unwrap().fresh);
        // Stale entries keep their value
        assert_eq!(store.get(&documents).unwrap().value, 1);
    }

    #[tokio::test]
    async fn test_moka_store_clear() {
        let store = MokaEntryStore::new_unbounded();
        let quiz = key(&["/api/quizzes", "1"]);
        let deck = key(&["/api/flashcard-decks", "1"]);
        store.insert(quiz, CacheEntry::new(1u32));
        store.insert(deck.clone(), CacheEntry::new(2u32));

        assert_eq!(store.entry_count(), 2);

        store.clear();
        assert!(store.get(&deck).is_none());
        assert_eq!(store.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_moka_store_backs_query_cache() {
        let cache: QueryCache<u32> = QueryCache::new(
            Arc::new(MokaEntryStore::new_unbounded()),
            QueryCacheSettings::default(),
        );
        let quiz = key(&["/api/quizzes", "1"]);

        let first = cache
            .fetch(&quiz, QueryOptions::default(), || async { Ok::<_, Failure>(5) })
            .await;
        let second = cache
            .fetch(&quiz, QueryOptions::default(), || async { Ok::<_, Failure>(6) })
            .await;

        assert_eq!(first, Ok(Some(5)));
        assert_eq!(second, Ok(Some(5)));
        assert_eq!(cache.entry_count(), 1);
    }
}
