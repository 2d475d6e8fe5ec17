use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{SessionRecord, SiteCategory};

/// Query/upsert interface over the remote `user_auth_details` table.
///
/// `upsert` must be atomic on (user_id, cookies_type): concurrent calls for
/// one key resolve to a single row holding one of the written payloads,
/// never two rows and never a torn write. A missing row is reported as
/// `Ok(None)` from `fetch`, not as an error.
pub trait SessionStore {
    fn fetch(
        &self,
        user_id: Uuid,
        category: SiteCategory,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    fn upsert(
        &self,
        record: SessionRecord,
    ) -> impl std::future::Future<Output = Result<SessionRecord, StoreError>> + Send;

    /// Authorize subsequent requests as the signed-in user. Stores without
    /// per-user authorization ignore it.
    fn set_access_token(&self, _access_token: &str) {}
}
