use std::sync::Arc;

use hwsync_store::{SessionStore, SiteCategory};
use uuid::Uuid;

/// Outcome of a sync-status lookup. A missing record is a normal state that
/// prompts the initial sync, which is why it is kept apart from the store
/// being unreachable instead of both collapsing into one boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    NotFound,
    Unavailable(String),
    Found { in_sync: bool },
}

impl SyncStatus {
    pub fn exists(&self) -> bool {
        matches!(self, SyncStatus::Found { .. })
    }

    pub fn in_sync(&self) -> bool {
        matches!(self, SyncStatus::Found { in_sync: true })
    }
}

/// Answers "is this user's session for this site category current?"
pub struct SyncStatusResolver<S> {
    store: Arc<S>,
}

impl<S> SyncStatusResolver<S>
where
    S: SessionStore + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Never an error: every failure mode is encoded in [`SyncStatus`].
    pub async fn check_status(&self, user_id: Uuid, site_key: &str) -> SyncStatus {
        let category = SiteCategory::from_site_key(site_key);

        match self.store.fetch(user_id, category).await {
            Ok(Some(record)) => SyncStatus::Found {
                in_sync: record.in_sync,
            },
            Ok(None) => {
                tracing::info!(%user_id, %category, "no sync record, initial sync needed");
                SyncStatus::NotFound
            }
            Err(e) => {
                tracing::warn!(%user_id, %category, error = %e, "sync status lookup failed");
                SyncStatus::Unavailable(e.to_string())
            }
        }
    }
}
