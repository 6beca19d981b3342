//! In-memory cache tier.

use super::entry::{CacheEntry, ClockSource};
use crate::domain::RepoId;
use chrono::TimeDelta;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

/// One TTL-bounded value per repository.
///
/// Expired entries are dropped lazily, when a read finds them stale.
#[derive(Debug)]
pub struct MemoryCache<T> {
    entries: RwLock<HashMap<RepoId, CacheEntry<Arc<T>>>>,
    ttl: TimeDelta,
    clock: Arc<dyn ClockSource>,
}

impl<T: Send + Sync> MemoryCache<T> {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: TimeDelta, clock: Arc<dyn ClockSource>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// The valid value for `repo`, if any.
    pub async fn get(&self, repo: &RepoId) -> Option<Arc<T>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(repo) {
                None => return None,
                Some(entry) if entry.is_valid_at(now) => return Some(Arc::clone(&entry.data)),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Re-check: another writer may have refreshed the entry meanwhile.
        if entries.get(repo).is_some_and(|entry| !entry.is_valid_at(now)) {
            entries.remove(repo);
            trace!(repo = %repo, "Dropped expired memory entry");
        }
        None
    }

    /// The valid value for `repo`, without evicting stale entries.
    pub async fn peek(&self, repo: &RepoId) -> Option<Arc<T>> {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .get(repo)
            .filter(|entry| entry.is_valid_at(now))
            .map(|entry| Arc::clone(&entry.data))
    }

    /// Install `value` for `repo`, replacing any previous entry.
    pub async fn insert(&self, repo: RepoId, value: Arc<T>) {
        let entry = CacheEntry::new(value, self.clock.now(), self.ttl);
        self.entries.write().await.insert(repo, entry);
    }

    /// Forget the entry for `repo`.
    pub async fn remove(&self, repo: &RepoId) {
        self.entries.write().await.remove(repo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::ManualClock;
    use chrono::Utc;

    fn cache() -> (MemoryCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = MemoryCache::new(TimeDelta::seconds(30), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn hit_within_ttl() {
        let (cache, clock) = cache();
        let repo = RepoId::from("r");
        cache.insert(repo.clone(), Arc::new("graph".to_string())).await;

        clock.advance(TimeDelta::seconds(30));

        assert_eq!(cache.get(&repo).await.as_deref().map(String::as_str), Some("graph"));
    }

    #[tokio::test]
    async fn miss_after_ttl() {
        let (cache, clock) = cache();
        let repo = RepoId::from("r");
        cache.insert(repo.clone(), Arc::new("graph".to_string())).await;

        clock.advance(TimeDelta::seconds(30) + TimeDelta::milliseconds(1));

        assert!(cache.peek(&repo).await.is_none());
        assert!(cache.get(&repo).await.is_none());
    }

    #[tokio::test]
    async fn entries_are_per_repository() {
        let (cache, _clock) = cache();
        cache.insert("a".into(), Arc::new("one".to_string())).await;

        assert!(cache.get(&"b".into()).await.is_none());
        cache.remove(&"a".into()).await;
        assert!(cache.get(&"a".into()).await.is_none());
    }
}
