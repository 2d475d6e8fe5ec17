use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::tabs::TabId;

/// One cookie from the browser jar, scoped to a domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix seconds; session cookies have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<f64>,
}

/// Plain key/value copies of a page's `localStorage` and `sessionStorage`,
/// detached from the live objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub local: BTreeMap<String, String>,
    pub session: BTreeMap<String, String>,
}

impl StorageSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Page-content capabilities: cookie enumeration, the in-page storage
/// snapshot script, and database-name listing (names only, never content).
pub trait PageHost {
    fn cookies_for_domain(
        &self,
        domain: &str,
    ) -> impl std::future::Future<Output = Result<Vec<CookieRecord>, HostError>> + Send;

    fn storage_snapshot(
        &self,
        tab: TabId,
    ) -> impl std::future::Future<Output = Result<StorageSnapshot, HostError>> + Send;

    fn database_names(
        &self,
        tab: TabId,
    ) -> impl std::future::Future<Output = Result<Vec<String>, HostError>> + Send;
}
