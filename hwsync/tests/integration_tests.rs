use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hwsync::dispatch::{MSG_CHECK_SYNC_STATUS, MSG_COPY_SESSION, MSG_GOOGLE_AUTH};
use hwsync::Dispatcher;
use hwsync_auth::{
    AuthError, AuthTokenPair, BackendSession, IdentityApi, OAuthBridge, SessionFile, SessionUser,
};
use hwsync_host::mock::MockHost;
use hwsync_host::{StorageSnapshot, TabHost, TabId, TabRef};
use hwsync_store::{MemoryStore, SessionStore, SiteCategory};
use serde_json::{json, Value};
use uuid::Uuid;

const GRADESCOPE_URL: &str = "https://www.gradescope.com/courses/12345";

fn test_user() -> Uuid {
    Uuid::from_u128(0x1234_5678)
}

fn test_session() -> BackendSession {
    BackendSession {
        access_token: "access-test".to_string(),
        refresh_token: "refresh-test".to_string(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
        user: SessionUser {
            id: test_user(),
            email: Some("student@columbia.edu".to_string()),
        },
    }
}

fn temp_session_file() -> SessionFile {
    SessionFile::at(std::env::temp_dir().join(format!("hwsync-test-{}.json", Uuid::new_v4())))
}

/// Scripted identity layer: hands out a canned authorization URL and either
/// completes or rejects the exchange.
#[derive(Default)]
struct StubIdentity {
    fail_exchange: bool,
}

impl IdentityApi for StubIdentity {
    fn authorize_url(&self, redirect_to: &str) -> Result<String, AuthError> {
        Ok(format!(
            "https://id.example/authorize?provider=google&redirect_to={redirect_to}"
        ))
    }

    async fn establish_session(
        &self,
        tokens: &AuthTokenPair,
    ) -> Result<BackendSession, AuthError> {
        if self.fail_exchange {
            return Err(AuthError::Exchange("invalid grant".to_string()));
        }
        Ok(BackendSession {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            ..test_session()
        })
    }
}

struct TestSetup {
    host: Arc<MockHost>,
    store: Arc<MemoryStore>,
    session_file: SessionFile,
    dispatcher: Dispatcher<MockHost, MemoryStore, StubIdentity>,
}

fn setup(signed_in: bool) -> TestSetup {
    let host = Arc::new(MockHost::new());
    let store = Arc::new(MemoryStore::new());
    let session_file = temp_session_file();
    if signed_in {
        session_file.save(&test_session()).unwrap();
    }
    let bridge = OAuthBridge::new(host.clone(), StubIdentity::default(), session_file.clone());
    let dispatcher = Dispatcher::new(host.clone(), store.clone(), bridge, session_file.clone());
    TestSetup {
        host,
        store,
        session_file,
        dispatcher,
    }
}

fn gradescope_fixtures(host: &MockHost, tab: TabId) {
    host.insert_cookies(
        "www.gradescope.com",
        vec![MockHost::cookie("_session", "abc123", "www.gradescope.com")],
    );
    let mut snapshot = StorageSnapshot::empty();
    snapshot
        .local
        .insert("auth_state".to_string(), "logged-in".to_string());
    snapshot
        .session
        .insert("csrf".to_string(), "tok".to_string());
    host.insert_storage(tab, snapshot);
    host.insert_databases(tab, vec!["firebaseLocalStorageDb".to_string()]);
}

async fn check(setup: &TestSetup, site: &str) -> Value {
    setup
        .dispatcher
        .handle(MSG_CHECK_SYNC_STATUS, json!({ "site": site }))
        .await
}

// --- Sync flows --------------------------------------------------------

#[tokio::test]
async fn scenario_a_first_sync() {
    let s = setup(true);
    let tab = TabId(7);
    gradescope_fixtures(&s.host, tab);

    // No record yet: benign, prompts the initial sync.
    let status = check(&s, "gradescope").await;
    assert_eq!(status["success"], true);
    assert_eq!(status["inSync"], false);
    assert_eq!(status["message"], "no sync record found");

    let response = s
        .dispatcher
        .handle(
            MSG_COPY_SESSION,
            json!({
                "tab": { "url": GRADESCOPE_URL, "id": 7 },
                "site": "gradescope"
            }),
        )
        .await;

    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["in_sync"], true);
    assert_eq!(response["data"]["cookies_type"], "gradescope");
    assert_eq!(response["data"]["cookies"]["cookies"][0]["name"], "_session");
    assert_eq!(s.store.len(), 1);

    let status = check(&s, "gradescope").await;
    assert_eq!(status["success"], true);
    assert_eq!(status["inSync"], true);

    s.session_file.delete().unwrap();
}

#[tokio::test]
async fn scenario_b_resync_replaces_payload() {
    let s = setup(true);
    let tab = TabId(4);
    gradescope_fixtures(&s.host, tab);

    // Seed a stale record.
    let stale = hwsync_store::SessionRecord {
        user_id: test_user(),
        category: SiteCategory::Gradescope,
        payload: hwsync_store::SessionPayload::new(
            Vec::new(),
            StorageSnapshot::empty(),
            Vec::new(),
            "https://www.gradescope.com/old".to_string(),
        ),
        in_sync: false,
    };
    s.store.upsert(stale).await.unwrap();

    let status = check(&s, "gradescope").await;
    assert_eq!(status["success"], true);
    assert_eq!(status["inSync"], false);
    assert!(status.get("message").is_none());

    let response = s
        .dispatcher
        .handle(
            MSG_COPY_SESSION,
            json!({
                "tab": { "url": GRADESCOPE_URL, "id": 4 },
                "site": "gradescope"
            }),
        )
        .await;
    assert_eq!(response["success"], true);

    let row = s
        .store
        .fetch(test_user(), SiteCategory::Gradescope)
        .await
        .unwrap()
        .unwrap();
    assert!(row.in_sync);
    assert_eq!(row.payload.source_url, GRADESCOPE_URL);
    assert_eq!(s.store.len(), 1);

    s.session_file.delete().unwrap();
}

#[tokio::test]
async fn content_script_capture_falls_back_to_active_tab() {
    let s = setup(true);
    let active = TabId(3);
    gradescope_fixtures(&s.host, active);
    s.host.set_active_tab(Some(TabRef {
        url: GRADESCOPE_URL.to_string(),
        id: Some(active),
    }));

    // Content-script callers have no tab id and no site key.
    let response = s
        .dispatcher
        .handle(
            MSG_COPY_SESSION,
            json!({ "tab": { "url": GRADESCOPE_URL } }),
        )
        .await;

    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["cookies_type"], "gradescope");
    assert_eq!(
        response["data"]["cookies"]["local_storage"]["auth_state"],
        "logged-in"
    );
    assert_eq!(
        response["data"]["cookies"]["databases"][0],
        "firebaseLocalStorageDb"
    );

    s.session_file.delete().unwrap();
}

#[tokio::test]
async fn capture_without_any_tab_ships_empty_snapshot() {
    let s = setup(true);
    s.host.insert_cookies(
        "www.gradescope.com",
        vec![MockHost::cookie("_session", "abc123", "www.gradescope.com")],
    );
    // No active tab at all.

    let response = s
        .dispatcher
        .handle(
            MSG_COPY_SESSION,
            json!({ "tab": { "url": GRADESCOPE_URL } }),
        )
        .await;

    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["cookies"]["cookies"][0]["name"], "_session");
    assert!(response["data"]["cookies"]["local_storage"]
        .as_object()
        .unwrap()
        .is_empty());

    s.session_file.delete().unwrap();
}

#[tokio::test]
async fn denied_storage_script_degrades_to_partial_payload() {
    let s = setup(true);
    let tab = TabId(9);
    gradescope_fixtures(&s.host, tab);
    s.host.deny_storage_scripts(true);

    let response = s
        .dispatcher
        .handle(
            MSG_COPY_SESSION,
            json!({
                "tab": { "url": GRADESCOPE_URL, "id": 9 },
                "site": "gradescope"
            }),
        )
        .await;

    assert_eq!(response["success"], true);
    assert_eq!(response["data"]["cookies"]["cookies"][0]["name"], "_session");
    assert!(response["data"]["cookies"]["session_storage"]
        .as_object()
        .unwrap()
        .is_empty());

    s.session_file.delete().unwrap();
}

#[tokio::test]
async fn operations_require_a_signed_in_user() {
    let s = setup(false);

    let status = check(&s, "gradescope").await;
    assert_eq!(status["success"], false);
    assert_eq!(status["message"], "not signed in");

    let response = s
        .dispatcher
        .handle(
            MSG_COPY_SESSION,
            json!({ "tab": { "url": GRADESCOPE_URL }, "site": "gradescope" }),
        )
        .await;
    assert_eq!(response["success"], false);
    assert_eq!(response["error"], "not signed in");
    assert!(s.store.is_empty());
}

#[tokio::test]
async fn store_calls_carry_the_signed_in_users_token() {
    let s = setup(true);
    let tab = TabId(5);
    gradescope_fixtures(&s.host, tab);
    // Nothing authorized the store yet.
    assert!(s.store.access_token().is_none());

    let response = s
        .dispatcher
        .handle(
            MSG_COPY_SESSION,
            json!({
                "tab": { "url": GRADESCOPE_URL, "id": 5 },
                "site": "gradescope"
            }),
        )
        .await;

    assert_eq!(response["success"], true);
    assert_eq!(s.store.access_token().as_deref(), Some("access-test"));

    s.session_file.delete().unwrap();
}

#[tokio::test]
async fn expired_session_requires_a_fresh_login() {
    let s = setup(false);
    let mut session = test_session();
    session.expires_at = Utc::now() - chrono::Duration::hours(1);
    s.session_file.save(&session).unwrap();

    let status = check(&s, "gradescope").await;
    assert_eq!(status["success"], false);
    assert_eq!(status["message"], "not signed in");

    s.session_file.delete().unwrap();
}

#[tokio::test]
async fn unavailable_store_is_a_failure_not_a_missing_record() {
    let s = setup(true);
    s.store.set_unavailable(true);

    let status = check(&s, "gradescope").await;
    assert_eq!(status["success"], false);
    assert_eq!(status["inSync"], false);
    assert_ne!(status["message"], "no sync record found");

    s.session_file.delete().unwrap();
}

#[tokio::test]
async fn unknown_message_is_rejected_structurally() {
    let s = setup(true);
    let response = s.dispatcher.handle("frobnicate", json!({})).await;
    assert_eq!(response["success"], false);

    let response = s
        .dispatcher
        .handle(MSG_COPY_SESSION, json!({ "nope": true }))
        .await;
    assert_eq!(response["success"], false);

    s.session_file.delete().unwrap();
}

// --- Auth flows --------------------------------------------------------

fn redirect_with_tokens(host: &MockHost) -> String {
    format!(
        "{}#access_token=issued-access&refresh_token=issued-refresh",
        host.redirect_url()
    )
}

fn bridge_with(
    host: &Arc<MockHost>,
    identity: StubIdentity,
    session_file: &SessionFile,
) -> OAuthBridge<MockHost, StubIdentity> {
    OAuthBridge::new(host.clone(), identity, session_file.clone())
}

async fn drive_login(
    host: &Arc<MockHost>,
    bridge: &OAuthBridge<MockHost, StubIdentity>,
    redirect: Option<String>,
) -> Result<BackendSession, AuthError> {
    let driver = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if let Some(url) = redirect {
            let tab = host.last_created_tab().expect("auth tab was created");
            host.emit_navigation(tab, &url);
        }
    };
    let (result, _) = tokio::join!(bridge.login(), driver);
    result
}

fn assert_cleaned_up(host: &MockHost) {
    let tab = host.last_created_tab().expect("auth tab was created");
    assert_eq!(host.close_count(tab), 1, "auth tab closed exactly once");
    assert_eq!(host.open_watchers(), 0, "navigation watcher leaked");
    assert_eq!(host.watchers_added(), host.watchers_removed());
}

#[tokio::test(start_paused = true)]
async fn login_success_persists_session_and_cleans_up() {
    let host = Arc::new(MockHost::new());
    let session_file = temp_session_file();
    let bridge = bridge_with(&host, StubIdentity::default(), &session_file);

    let redirect = redirect_with_tokens(&host);
    let session = drive_login(&host, &bridge, Some(redirect)).await.unwrap();

    assert_eq!(session.access_token, "issued-access");
    assert_eq!(session.user.id, test_user());
    assert!(session_file.load().unwrap().is_some());
    assert_cleaned_up(&host);

    session_file.delete().unwrap();
}

#[tokio::test(start_paused = true)]
async fn login_ignores_unrelated_navigations() {
    let host = Arc::new(MockHost::new());
    let session_file = temp_session_file();
    let bridge = bridge_with(&host, StubIdentity::default(), &session_file);

    let redirect = redirect_with_tokens(&host);
    let emitter = {
        let host = host.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let tab = host.last_created_tab().expect("auth tab was created");
            // Provider hop in the auth tab, then noise from another tab.
            host.emit_navigation(tab, "https://accounts.google.com/signin");
            host.emit_navigation(TabId(999), &redirect);
            host.emit_navigation(tab, &redirect);
        }
    };

    let (result, _) = tokio::join!(bridge.login(), emitter);
    result.unwrap();
    assert_cleaned_up(&host);

    session_file.delete().unwrap();
}

#[tokio::test(start_paused = true)]
async fn login_fails_without_tokens_in_redirect() {
    let host = Arc::new(MockHost::new());
    let session_file = temp_session_file();
    let bridge = bridge_with(&host, StubIdentity::default(), &session_file);

    let redirect = format!("{}?state=xyz", host.redirect_url());
    let err = drive_login(&host, &bridge, Some(redirect)).await.unwrap_err();

    assert!(matches!(err, AuthError::TokenExtraction(_)));
    assert!(session_file.load().unwrap().is_none());
    assert_cleaned_up(&host);
}

#[tokio::test(start_paused = true)]
async fn login_surfaces_rejected_exchange() {
    let host = Arc::new(MockHost::new());
    let session_file = temp_session_file();
    let bridge = bridge_with(
        &host,
        StubIdentity {
            fail_exchange: true,
        },
        &session_file,
    );

    let redirect = redirect_with_tokens(&host);
    let err = drive_login(&host, &bridge, Some(redirect)).await.unwrap_err();

    assert!(matches!(err, AuthError::Exchange(_)));
    assert!(session_file.load().unwrap().is_none());
    assert_cleaned_up(&host);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_deadline_elapses_without_redirect() {
    let host = Arc::new(MockHost::new());
    let session_file = temp_session_file();
    // Full default deadline; paused time fast-forwards through it.
    let bridge = bridge_with(&host, StubIdentity::default(), &session_file);

    let err = bridge.login().await.unwrap_err();

    assert!(matches!(err, AuthError::Timeout));
    assert!(session_file.load().unwrap().is_none());
    assert_cleaned_up(&host);
}

#[tokio::test(start_paused = true)]
async fn repeated_logins_never_leak_watchers() {
    let host = Arc::new(MockHost::new());
    let session_file = temp_session_file();
    let bridge = bridge_with(&host, StubIdentity::default(), &session_file)
        .with_timeout(Duration::from_secs(1));

    // One timeout, then one success.
    let err = bridge.login().await.unwrap_err();
    assert!(matches!(err, AuthError::Timeout));

    let redirect = redirect_with_tokens(&host);
    drive_login(&host, &bridge, Some(redirect)).await.unwrap();

    assert_eq!(host.watchers_added(), 2);
    assert_eq!(host.watchers_removed(), 2);
    assert_eq!(host.open_watchers(), 0);
    for (tab, _) in host.created_tabs() {
        assert_eq!(host.close_count(tab), 1);
    }

    session_file.delete().unwrap();
}

#[tokio::test(start_paused = true)]
async fn google_auth_message_signs_the_user_in() {
    let s = setup(false);

    let login = s.dispatcher.handle(MSG_GOOGLE_AUTH, json!({}));
    let emitter = {
        let host = s.host.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let tab = host.last_created_tab().expect("auth tab was created");
            let url = format!(
                "{}#access_token=issued-access&refresh_token=issued-refresh",
                host.redirect_url()
            );
            host.emit_navigation(tab, &url);
        }
    };
    let (response, _) = tokio::join!(login, emitter);

    assert_eq!(response["success"], true);
    assert_eq!(response["session"]["user"]["id"], test_user().to_string());
    // The fresh token authorizes the store right away.
    assert_eq!(s.store.access_token().as_deref(), Some("issued-access"));
    assert_cleaned_up(&s.host);

    // Captures are attributable from now on.
    let status = check(&s, "gradescope").await;
    assert_eq!(status["success"], true);
    assert_eq!(status["inSync"], false);

    s.session_file.delete().unwrap();
}

#[tokio::test(start_paused = true)]
async fn google_auth_timeout_is_a_structured_failure() {
    let s = setup(false);

    let response = s.dispatcher.handle(MSG_GOOGLE_AUTH, json!({})).await;

    assert_eq!(response["success"], false);
    assert_eq!(response["error"], "authentication timed out");
    assert!(response.get("session").is_none());
    assert_cleaned_up(&s.host);
}
