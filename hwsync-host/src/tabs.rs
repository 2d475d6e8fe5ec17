use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::HostError;

/// Browser-assigned tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i32);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tab as seen across the message boundary. Content-script callers only
/// know their page URL, so the id is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabRef {
    pub url: String,
    #[serde(default)]
    pub id: Option<TabId>,
}

/// A committed navigation in some tab.
#[derive(Debug, Clone)]
pub struct NavigationEvent {
    pub tab_id: TabId,
    pub url: String,
}

/// Identifies a registered navigation listener so it can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(pub u64);

/// Receiving end of a navigation subscription. The watcher stays registered
/// with the host until `TabHost::unwatch_navigation` is called with its id.
pub struct NavigationWatcher {
    id: WatcherId,
    rx: mpsc::UnboundedReceiver<NavigationEvent>,
}

impl NavigationWatcher {
    pub fn new(id: WatcherId, rx: mpsc::UnboundedReceiver<NavigationEvent>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> WatcherId {
        self.id
    }

    /// Next navigation event, or `None` once the host side is gone.
    pub async fn recv(&mut self) -> Option<NavigationEvent> {
        self.rx.recv().await
    }
}

/// Tab lifecycle and identity capabilities of the browser.
pub trait TabHost {
    /// Open a new tab at `url`, optionally focusing it.
    fn create_tab(
        &self,
        url: &str,
        active: bool,
    ) -> impl std::future::Future<Output = Result<TabId, HostError>> + Send;

    fn close_tab(
        &self,
        id: TabId,
    ) -> impl std::future::Future<Output = Result<(), HostError>> + Send;

    /// The active tab in the current window, if any.
    fn active_tab(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<TabRef>, HostError>> + Send;

    /// Register a navigation listener. Callers own the returned watcher and
    /// must deregister it with [`TabHost::unwatch_navigation`] when done.
    fn watch_navigation(&self) -> NavigationWatcher;

    fn unwatch_navigation(&self, id: WatcherId);

    /// The extension's identity redirect URL, provisioned by the browser.
    fn redirect_url(&self) -> String;
}
