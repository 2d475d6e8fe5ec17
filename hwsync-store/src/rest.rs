use std::sync::RwLock;
use std::time::Duration;

use reqwest::Client;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{SessionRecord, SiteCategory};
use crate::store::SessionStore;

const TABLE_PATH: &str = "rest/v1/user_auth_details";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// REST client for the backend store, speaking PostgREST conventions.
/// Upserts go through `on_conflict` merge resolution so the insert-or-update
/// decision happens atomically at the store, not in this process.
///
/// Requests start out under the anonymous key; once a user signs in the
/// dispatcher forwards their access token via `set_access_token`, which
/// row-level policies on the store require for reads and writes.
pub struct RestStore {
    http: Client,
    base_url: String,
    api_key: String,
    bearer: RwLock<String>,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bearer: RwLock::new(api_key.to_string()),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.base_url, TABLE_PATH)
    }

    fn bearer(&self) -> String {
        self.bearer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn read_rows(&self, resp: reqwest::Response) -> Result<Vec<SessionRecord>, StoreError> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }
}

impl SessionStore for RestStore {
    async fn fetch(
        &self,
        user_id: Uuid,
        category: SiteCategory,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let resp = self
            .http
            .get(self.table_url())
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("cookies_type", format!("eq.{category}")),
                ("select", "*".to_string()),
            ])
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .send()
            .await?;

        let mut rows = self.read_rows(resp).await?;
        tracing::debug!(%user_id, %category, found = !rows.is_empty(), "fetched sync record");
        Ok(rows.pop())
    }

    async fn upsert(&self, record: SessionRecord) -> Result<SessionRecord, StoreError> {
        let resp = self
            .http
            .post(self.table_url())
            .query(&[("on_conflict", "user_id,cookies_type")])
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&record)
            .send()
            .await?;

        let mut rows = self.read_rows(resp).await?;
        let written = rows.pop().ok_or_else(|| StoreError::Api {
            status: 200,
            message: "upsert returned no representation".to_string(),
        })?;

        tracing::debug!(
            user_id = %written.user_id,
            category = %written.category,
            in_sync = written.in_sync,
            "upserted sync record"
        );
        Ok(written)
    }

    fn set_access_token(&self, access_token: &str) {
        let mut bearer = self
            .bearer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *bearer = access_token.to_string();
    }
}
