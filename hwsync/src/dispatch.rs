use std::sync::Arc;
use std::time::Duration;

use hwsync_auth::{AuthError, IdentityApi, OAuthBridge, RestIdentity, SessionFile, SessionUser};
use hwsync_host::{PageHost, TabHost};
use hwsync_store::{RestStore, SessionStore, SiteCategory};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use crate::capture::SessionCapture;
use crate::classifier::classify;
use crate::coordinator::UpsertCoordinator;
use crate::messages::{
    AuthResponse, CheckSyncStatusBody, CopySessionBody, CopySessionResponse, SyncStatusResponse,
};
use crate::resolver::{SyncStatus, SyncStatusResolver};
use crate::settings::Settings;

pub const MSG_CHECK_SYNC_STATUS: &str = "check-sync-status";
pub const MSG_COPY_SESSION: &str = "copy-session";
pub const MSG_GOOGLE_AUTH: &str = "google-auth";

/// Request/response entry point of the background core. The transport
/// (extension messaging) lives outside; this only sees a name and a JSON
/// body, and always answers with a structured body, never an Err.
pub struct Dispatcher<H, S, I> {
    capture: SessionCapture<H>,
    resolver: SyncStatusResolver<S>,
    coordinator: UpsertCoordinator<S>,
    bridge: OAuthBridge<H, I>,
    session_file: SessionFile,
    store: Arc<S>,
}

impl<H, S, I> Dispatcher<H, S, I>
where
    H: TabHost + PageHost + Send + Sync,
    S: SessionStore + Send + Sync,
    I: IdentityApi + Send + Sync,
{
    pub fn new(
        host: Arc<H>,
        store: Arc<S>,
        bridge: OAuthBridge<H, I>,
        session_file: SessionFile,
    ) -> Self {
        Self {
            capture: SessionCapture::new(host),
            resolver: SyncStatusResolver::new(store.clone()),
            coordinator: UpsertCoordinator::new(store.clone()),
            bridge,
            session_file,
            store,
        }
    }

    /// Handle one message. Unknown names and malformed bodies come back as
    /// `{success: false, ...}` like every other failure.
    pub async fn handle(&self, name: &str, body: Value) -> Value {
        match name {
            MSG_CHECK_SYNC_STATUS => {
                with_body(body, |b| async move { self.check_sync_status(b).await }).await
            }
            MSG_COPY_SESSION => {
                with_body(body, |b| async move { self.copy_session(b).await }).await
            }
            MSG_GOOGLE_AUTH => to_body(self.google_auth().await),
            _ => {
                tracing::warn!(name, "unknown message");
                json!({ "success": false, "error": format!("unknown message: {name}") })
            }
        }
    }

    async fn check_sync_status(&self, body: CheckSyncStatusBody) -> SyncStatusResponse {
        let user = match self.signed_in_user() {
            Some(user) => user,
            None => return SyncStatusResponse::failure("not signed in"),
        };

        match self.resolver.check_status(user.id, &body.site).await {
            SyncStatus::Found { in_sync } => SyncStatusResponse::found(in_sync),
            SyncStatus::NotFound => SyncStatusResponse::not_found(),
            SyncStatus::Unavailable(reason) => SyncStatusResponse::failure(reason),
        }
    }

    async fn copy_session(&self, body: CopySessionBody) -> CopySessionResponse {
        let user = match self.signed_in_user() {
            Some(user) => user,
            None => return CopySessionResponse::failure("not signed in"),
        };

        let category = match site_category(&body) {
            Ok(category) => category,
            Err(e) => return CopySessionResponse::failure(e),
        };

        let payload = match self.capture.capture(&body.tab).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(url = %body.tab.url, error = %e, "capture failed");
                return CopySessionResponse::failure(e.to_string());
            }
        };

        match self.coordinator.sync(user.id, category, payload).await {
            Ok(record) => CopySessionResponse::synced(record),
            Err(e) => {
                tracing::warn!(user_id = %user.id, %category, error = %e, "sync failed");
                CopySessionResponse::failure(e.to_string())
            }
        }
    }

    async fn google_auth(&self) -> AuthResponse {
        match self.bridge.login().await {
            Ok(session) => {
                self.store.set_access_token(&session.access_token);
                AuthResponse::signed_in(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "login flow failed");
                AuthResponse::failure(e.to_string())
            }
        }
    }

    /// Captures are attributed to the persisted backend session's user;
    /// without a live one the caller must run `google-auth` first. A live
    /// session also authorizes the store, so its row policies see the
    /// user's token rather than the anonymous key.
    fn signed_in_user(&self) -> Option<SessionUser> {
        match self.session_file.load() {
            Ok(Some(session)) => {
                if self.session_file.is_expired(&session) {
                    tracing::info!(user_id = %session.user.id, "stored session expired");
                    return None;
                }
                self.store.set_access_token(&session.access_token);
                Some(session.user)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored session");
                None
            }
        }
    }
}

impl<H> Dispatcher<H, RestStore, RestIdentity>
where
    H: TabHost + PageHost + Send + Sync,
{
    /// Wire up the production store and identity clients from settings.
    pub fn from_settings(host: Arc<H>, settings: &Settings) -> Result<Self, AuthError> {
        settings.validate().map_err(AuthError::Configuration)?;

        let store = RestStore::new(&settings.store.base_url, &settings.store.api_key)
            .map_err(|e| AuthError::Configuration(e.to_string()))?;
        let identity = RestIdentity::new(
            &settings.auth.identity_url,
            &settings.auth.api_key,
            &settings.auth.provider,
        )?;
        let session_file = SessionFile::new()?;
        let bridge = OAuthBridge::new(host.clone(), identity, session_file.clone())
            .with_timeout(Duration::from_secs(settings.auth.flow_timeout_secs));

        Ok(Self::new(host, Arc::new(store), bridge, session_file))
    }
}

fn site_category(body: &CopySessionBody) -> Result<SiteCategory, String> {
    if let Some(site) = &body.site {
        return Ok(SiteCategory::from_site_key(site));
    }

    let url =
        Url::parse(&body.tab.url).map_err(|_| format!("cannot capture from {}", body.tab.url))?;
    let hostname = url
        .host_str()
        .ok_or_else(|| format!("cannot capture from {}", body.tab.url))?;
    Ok(classify(hostname))
}

async fn with_body<B, R, F, Fut>(body: Value, f: F) -> Value
where
    B: DeserializeOwned,
    R: Serialize,
    F: FnOnce(B) -> Fut,
    Fut: std::future::Future<Output = R>,
{
    match serde_json::from_value(body) {
        Ok(parsed) => to_body(f(parsed).await),
        Err(e) => json!({ "success": false, "error": format!("malformed request body: {e}") }),
    }
}

fn to_body<R: Serialize>(response: R) -> Value {
    serde_json::to_value(response)
        .unwrap_or_else(|e| json!({ "success": false, "error": e.to_string() }))
}
