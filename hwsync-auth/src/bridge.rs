use std::sync::Arc;
use std::time::Duration;

use hwsync_host::{NavigationWatcher, TabHost, TabId, WatcherId};

use crate::error::AuthError;
use crate::identity::IdentityApi;
use crate::redirect::extract_tokens;
use crate::session::{BackendSession, SessionFile};

/// Deadline for the whole login flow, tab open through token exchange.
pub const DEFAULT_FLOW_TIMEOUT: Duration = Duration::from_secs(300);

/// States of one login flow, traced as it advances. `Complete`, `Failed`,
/// and `TimedOut` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeState {
    Idle,
    AwaitingRedirect,
    Exchanging,
    Complete,
    Failed,
    TimedOut,
}

/// Drives an interactive identity-provider login in a transient tab.
///
/// One flow at a time per call: open a foreground tab at the authorization
/// URL, watch navigations for the redirect back to the extension, extract
/// the issued tokens, exchange them for a backend session, and persist it.
/// On every terminal path the navigation watcher is deregistered and the
/// auth tab closed exactly once.
pub struct OAuthBridge<T, I> {
    tabs: Arc<T>,
    identity: I,
    session_file: SessionFile,
    flow_timeout: Duration,
}

impl<T, I> OAuthBridge<T, I>
where
    T: TabHost + Send + Sync,
    I: IdentityApi + Send + Sync,
{
    pub fn new(tabs: Arc<T>, identity: I, session_file: SessionFile) -> Self {
        Self {
            tabs,
            identity,
            session_file,
            flow_timeout: DEFAULT_FLOW_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, flow_timeout: Duration) -> Self {
        self.flow_timeout = flow_timeout;
        self
    }

    /// Run one complete login flow.
    pub async fn login(&self) -> Result<BackendSession, AuthError> {
        let mut state = BridgeState::Idle;
        let redirect_prefix = self.tabs.redirect_url();
        let authorize_url = self.identity.authorize_url(&redirect_prefix)?;

        // Watch before opening the tab so an instant redirect can't slip
        // between tab creation and listener registration.
        let mut watcher = self.tabs.watch_navigation();
        let watcher_id = watcher.id();

        let tab = match self.tabs.create_tab(&authorize_url, true).await {
            Ok(tab) => tab,
            Err(e) => {
                self.tabs.unwatch_navigation(watcher_id);
                transition(&mut state, BridgeState::Failed);
                return Err(e.into());
            }
        };
        transition(&mut state, BridgeState::AwaitingRedirect);

        let mut cleanup = FlowCleanup::new(tab, watcher_id);
        let outcome = tokio::time::timeout(
            self.flow_timeout,
            self.drive(&mut state, &mut watcher, tab, &redirect_prefix),
        )
        .await;

        // Shared cleanup for all three terminal paths.
        cleanup.run(self.tabs.as_ref()).await;

        match outcome {
            Err(_elapsed) => {
                transition(&mut state, BridgeState::TimedOut);
                Err(AuthError::Timeout)
            }
            Ok(Err(e)) => {
                transition(&mut state, BridgeState::Failed);
                Err(e)
            }
            Ok(Ok(session)) => match self.session_file.save(&session) {
                Ok(()) => {
                    transition(&mut state, BridgeState::Complete);
                    Ok(session)
                }
                Err(e) => {
                    transition(&mut state, BridgeState::Failed);
                    Err(e)
                }
            },
        }
    }

    async fn drive(
        &self,
        state: &mut BridgeState,
        watcher: &mut NavigationWatcher,
        tab: TabId,
        redirect_prefix: &str,
    ) -> Result<BackendSession, AuthError> {
        let redirect = loop {
            match watcher.recv().await {
                Some(nav) if nav.tab_id == tab && nav.url.starts_with(redirect_prefix) => {
                    break nav.url;
                }
                // Navigation elsewhere, or an intermediate provider hop.
                Some(_) => continue,
                None => {
                    return Err(AuthError::Exchange(
                        "navigation watcher closed before redirect".to_string(),
                    ))
                }
            }
        };

        tracing::debug!(%tab, "redirect observed");
        let tokens = extract_tokens(&redirect)?;

        transition(state, BridgeState::Exchanging);
        self.identity.establish_session(&tokens).await
    }
}

fn transition(state: &mut BridgeState, next: BridgeState) {
    tracing::debug!(from = ?*state, to = ?next, "auth flow transition");
    *state = next;
}

/// Completion guard around the shared cleanup routine. Whichever of the
/// redirect and the deadline wins, each resource is released at most once.
struct FlowCleanup {
    tab: Option<TabId>,
    watcher: Option<WatcherId>,
}

impl FlowCleanup {
    fn new(tab: TabId, watcher: WatcherId) -> Self {
        Self {
            tab: Some(tab),
            watcher: Some(watcher),
        }
    }

    async fn run<T: TabHost>(&mut self, tabs: &T) {
        if let Some(id) = self.watcher.take() {
            tabs.unwatch_navigation(id);
        }
        if let Some(tab) = self.tab.take() {
            // The user may have closed the tab themselves.
            if let Err(e) = tabs.close_tab(tab).await {
                tracing::debug!(%tab, error = %e, "auth tab already gone");
            }
        }
    }
}
