use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{SessionRecord, SiteCategory};
use crate::store::SessionStore;

/// In-memory `SessionStore` used by tests and local development. Rows live
/// in a [`DashMap`], so the upsert is atomic per key just like the REST
/// store's `on_conflict` merge.
#[derive(Default)]
pub struct MemoryStore {
    rows: DashMap<(Uuid, SiteCategory), SessionRecord>,
    unavailable: AtomicBool,
    access_token: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store being unreachable; every call fails until reset.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The last token passed through `set_access_token`, for assertions.
    pub fn access_token(&self) -> Option<String> {
        self.access_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn check_up(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    async fn fetch(
        &self,
        user_id: Uuid,
        category: SiteCategory,
    ) -> Result<Option<SessionRecord>, StoreError> {
        self.check_up()?;
        Ok(self.rows.get(&(user_id, category)).map(|r| r.clone()))
    }

    async fn upsert(&self, record: SessionRecord) -> Result<SessionRecord, StoreError> {
        self.check_up()?;
        let key = (record.user_id, record.category);
        self.rows.insert(key, record.clone());
        Ok(record)
    }

    fn set_access_token(&self, access_token: &str) {
        let mut token = self
            .access_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *token = Some(access_token.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwsync_host::StorageSnapshot;

    use crate::models::SessionPayload;

    fn payload(url: &str) -> SessionPayload {
        SessionPayload::new(
            Vec::new(),
            StorageSnapshot::empty(),
            Vec::new(),
            url.to_string(),
        )
    }

    fn record(user: Uuid, category: SiteCategory, url: &str) -> SessionRecord {
        SessionRecord {
            user_id: user,
            category,
            payload: payload(url),
            in_sync: true,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_instead_of_duplicating() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        store
            .upsert(record(user, SiteCategory::Gradescope, "https://a.example/"))
            .await
            .unwrap();
        store
            .upsert(record(user, SiteCategory::Gradescope, "https://b.example/"))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let row = store
            .fetch(user, SiteCategory::Gradescope)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.payload.source_url, "https://b.example/");
    }

    #[tokio::test]
    async fn missing_row_is_none_not_error() {
        let store = MemoryStore::new();
        let row = store
            .fetch(Uuid::new_v4(), SiteCategory::Courseworks)
            .await
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn unavailable_store_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store
            .fetch(Uuid::new_v4(), SiteCategory::Gradescope)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
