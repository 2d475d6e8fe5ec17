use std::sync::Arc;

use dashmap::DashMap;
use hwsync_store::{SessionPayload, SessionRecord, SessionStore, SiteCategory, StoreError};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Persists captured sessions, one atomic conditional upsert per call.
///
/// The store's `upsert` already decides insert-vs-update on the
/// (user_id, cookies_type) conflict target, so there is no select-then-write
/// window here. A per-key mutex additionally serializes whole sync calls so
/// rapid re-triggers (page reload storms) apply in order.
pub struct UpsertCoordinator<S> {
    store: Arc<S>,
    locks: DashMap<(Uuid, SiteCategory), Arc<Mutex<()>>>,
}

impl<S> UpsertCoordinator<S>
where
    S: SessionStore + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Write `payload` as the current session for the key and mark it in
    /// sync. Either the stored record reflects the new payload with
    /// `in_sync = true`, or an error is returned and the record is
    /// unchanged.
    pub async fn sync(
        &self,
        user_id: Uuid,
        category: SiteCategory,
        payload: SessionPayload,
    ) -> Result<SessionRecord, StoreError> {
        let lock = {
            let entry = self
                .locks
                .entry((user_id, category))
                .or_insert_with(|| Arc::new(Mutex::new(())));
            entry.value().clone()
        };
        let guard = lock.lock().await;

        let record = SessionRecord {
            user_id,
            category,
            payload,
            in_sync: true,
        };
        let result = self.store.upsert(record).await;

        drop(guard);
        drop(lock);
        // Evict the lock once no other sync holds a clone, so the map
        // tracks in-flight keys rather than every key ever synced.
        self.locks
            .remove_if(&(user_id, category), |_, lock| Arc::strong_count(lock) == 1);

        result
    }
}
