use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::time::Instant;

use super::{CasOutcome, Store, StoreResult};

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// In-process store backed by a [`DashMap`].
///
/// Expired entries are evicted lazily when they are next touched. Writes to a
/// single key are serialized by the map's shard lock, which is what makes
/// [`Store::compare_and_set`] atomic here.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn evict_expired(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| entry.is_expired());
    }
}

impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.evict_expired(key);
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        self.entries.insert(
            key.to_owned(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn expire_after(&self, key: &str, seconds: u64) -> StoreResult<()> {
        self.evict_expired(key);
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
        }
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &[u8],
        value: Bytes,
    ) -> StoreResult<CasOutcome> {
        self.evict_expired(key);

        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(CasOutcome::Conflict);
        };

        if entry.value.as_ref() != expected {
            return Ok(CasOutcome::Conflict);
        }

        entry.value = value;
        Ok(CasOutcome::Swapped)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_what_was_set() {
        let store = MemoryStore::new();
        assert_eq!(store.get("paste:a").await.unwrap(), None);

        store.set("paste:a", Bytes::from_static(b"one")).await.unwrap();
        assert_eq!(
            store.get("paste:a").await.unwrap(),
            Some(Bytes::from_static(b"one"))
        );

        store.set("paste:a", Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(
            store.get("paste:a").await.unwrap(),
            Some(Bytes::from_static(b"two"))
        );
    }

    #[tokio::test]
    async fn compare_and_set_requires_matching_value() {
        let store = MemoryStore::new();
        store.set("k", Bytes::from_static(b"v1")).await.unwrap();

        let outcome = store
            .compare_and_set("k", b"stale", Bytes::from_static(b"v2"))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Conflict);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some(&b"v1"[..]));

        let outcome = store
            .compare_and_set("k", b"v1", Bytes::from_static(b"v2"))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Swapped);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some(&b"v2"[..]));
    }

    #[tokio::test]
    async fn compare_and_set_on_missing_key_conflicts() {
        let store = MemoryStore::new();
        let outcome = store
            .compare_and_set("missing", b"", Bytes::from_static(b"v"))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Conflict);
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expire_after_removes_key_once_elapsed() {
        let store = MemoryStore::new();
        store.set("k", Bytes::from_static(b"v")).await.unwrap();
        store.expire_after("k", 5).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn compare_and_set_keeps_expiry_but_set_clears_it() {
        let store = MemoryStore::new();
        store.set("k", Bytes::from_static(b"v1")).await.unwrap();
        store.expire_after("k", 10).await.unwrap();

        store
            .compare_and_set("k", b"v1", Bytes::from_static(b"v2"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", Bytes::from_static(b"v1")).await.unwrap();
        store.expire_after("k", 10).await.unwrap();
        store.set("k", Bytes::from_static(b"v2")).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expire_after_on_missing_key_is_a_no_op() {
        let store = MemoryStore::new();
        store.expire_after("missing", 1).await.unwrap();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", Bytes::from_static(b"v")).await.unwrap();
        assert!(other.get("k").await.unwrap().is_some());
        other.ping().await.unwrap();
    }
}
