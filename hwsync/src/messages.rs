//! Wire types for the three-message contract spoken over the extension's
//! request/response transport. Field casing matches what the foreground
//! scripts send and expect.

use hwsync_auth::BackendSession;
use hwsync_host::TabRef;
use hwsync_store::SessionRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CheckSyncStatusBody {
    pub site: String,
}

#[derive(Debug, Deserialize)]
pub struct CopySessionBody {
    pub tab: TabRef,
    /// The popup variant omits the site key; the hostname is classified
    /// instead.
    #[serde(default)]
    pub site: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub success: bool,
    #[serde(rename = "inSync")]
    pub in_sync: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncStatusResponse {
    pub fn found(in_sync: bool) -> Self {
        Self {
            success: true,
            in_sync,
            message: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: true,
            in_sync: false,
            message: Some("no sync record found".to_string()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            in_sync: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CopySessionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SessionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CopySessionResponse {
    pub fn synced(record: SessionRecord) -> Self {
        Self {
            success: true,
            data: Some(record),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<BackendSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResponse {
    pub fn signed_in(session: BackendSession) -> Self {
        Self {
            success: true,
            session: Some(session),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            session: None,
            error: Some(error.into()),
        }
    }
}
