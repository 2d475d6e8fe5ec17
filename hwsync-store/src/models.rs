use std::collections::BTreeMap;

use chrono::{serde::ts_seconds, DateTime, Utc};
use hwsync_host::{CookieRecord, StorageSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed classification of supported target sites; part of the storage key
/// (the `cookies_type` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteCategory {
    Gradescope,
    Courseworks,
    Miscellaneous,
}

impl SiteCategory {
    /// Map the message-layer site key to a category. The foreground scripts
    /// historically send `"canvas"` for the Courseworks deployment.
    pub fn from_site_key(key: &str) -> Self {
        match key {
            "gradescope" => SiteCategory::Gradescope,
            "canvas" | "courseworks" => SiteCategory::Courseworks,
            _ => SiteCategory::Miscellaneous,
        }
    }
}

impl std::fmt::Display for SiteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SiteCategory::Gradescope => "gradescope",
            SiteCategory::Courseworks => "courseworks",
            SiteCategory::Miscellaneous => "miscellaneous",
        };
        f.write_str(s)
    }
}

/// Everything captured from one tab in one pass. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPayload {
    pub cookies: Vec<CookieRecord>,
    pub local_storage: BTreeMap<String, String>,
    pub session_storage: BTreeMap<String, String>,
    /// Client-side database names only; contents are never extracted.
    pub databases: Vec<String>,
    pub source_url: String,
    #[serde(with = "ts_seconds")]
    pub captured_at: DateTime<Utc>,
}

impl SessionPayload {
    pub fn new(
        cookies: Vec<CookieRecord>,
        storage: StorageSnapshot,
        databases: Vec<String>,
        source_url: String,
    ) -> Self {
        Self {
            cookies,
            local_storage: storage.local,
            session_storage: storage.session,
            databases,
            source_url,
            captured_at: Utc::now(),
        }
    }
}

/// One row of `user_auth_details`, unique on (user_id, cookies_type).
/// `in_sync` is only ever set true together with a freshly captured payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: Uuid,
    #[serde(rename = "cookies_type")]
    pub category: SiteCategory,
    #[serde(rename = "cookies")]
    pub payload: SessionPayload,
    pub in_sync: bool,
}
