//! Instrumented in-memory host for tests (no real browser involved).
//!
//! Fixtures are loaded up front (`insert_cookies`, `insert_storage`, ...);
//! navigation is driven by calling [`MockHost::emit_navigation`]. Every tab
//! close and watcher registration is recorded so tests can assert the
//! cleanup contract (closed exactly once, no listener leaks).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::{
    CookieRecord, HostError, NavigationEvent, NavigationWatcher, PageHost, StorageSnapshot,
    TabHost, TabId, TabRef, WatcherId,
};

pub struct MockHost {
    next_tab: AtomicI32,
    next_watcher: AtomicU64,
    created: Mutex<Vec<(TabId, String)>>,
    closed: Mutex<Vec<TabId>>,
    active: Mutex<Option<TabRef>>,
    cookies: Mutex<HashMap<String, Vec<CookieRecord>>>,
    storage: Mutex<HashMap<TabId, StorageSnapshot>>,
    databases: Mutex<HashMap<TabId, Vec<String>>>,
    deny_storage: AtomicBool,
    watchers: Mutex<HashMap<WatcherId, mpsc::UnboundedSender<NavigationEvent>>>,
    watchers_added: AtomicUsize,
    watchers_removed: AtomicUsize,
    redirect: String,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            next_tab: AtomicI32::new(1),
            next_watcher: AtomicU64::new(1),
            created: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            active: Mutex::new(None),
            cookies: Mutex::new(HashMap::new()),
            storage: Mutex::new(HashMap::new()),
            databases: Mutex::new(HashMap::new()),
            deny_storage: AtomicBool::new(false),
            watchers: Mutex::new(HashMap::new()),
            watchers_added: AtomicUsize::new(0),
            watchers_removed: AtomicUsize::new(0),
            redirect: "https://extension.example/oauth2".to_string(),
        }
    }

    // Fixture setup -------------------------------------------------------

    pub fn set_active_tab(&self, tab: Option<TabRef>) {
        *self.active.lock().unwrap() = tab;
    }

    pub fn insert_cookies(&self, domain: &str, cookies: Vec<CookieRecord>) {
        self.cookies
            .lock()
            .unwrap()
            .insert(domain.to_string(), cookies);
    }

    pub fn insert_storage(&self, tab: TabId, snapshot: StorageSnapshot) {
        self.storage.lock().unwrap().insert(tab, snapshot);
    }

    pub fn insert_databases(&self, tab: TabId, names: Vec<String>) {
        self.databases.lock().unwrap().insert(tab, names);
    }

    /// Make subsequent storage-snapshot scripts fail, as a page with a
    /// restrictive CSP would.
    pub fn deny_storage_scripts(&self, deny: bool) {
        self.deny_storage.store(deny, Ordering::SeqCst);
    }

    /// Shorthand for building a cookie fixture.
    pub fn cookie(name: &str, value: &str, domain: &str) -> CookieRecord {
        CookieRecord {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            expires_at: None,
        }
    }

    // Navigation injection ------------------------------------------------

    /// Deliver a navigation event to every registered watcher.
    pub fn emit_navigation(&self, tab_id: TabId, url: &str) {
        let watchers = self.watchers.lock().unwrap();
        for tx in watchers.values() {
            let _ = tx.send(NavigationEvent {
                tab_id,
                url: url.to_string(),
            });
        }
    }

    // Assertions ----------------------------------------------------------

    pub fn last_created_tab(&self) -> Option<TabId> {
        self.created.lock().unwrap().last().map(|(id, _)| *id)
    }

    pub fn created_tabs(&self) -> Vec<(TabId, String)> {
        self.created.lock().unwrap().clone()
    }

    /// Every close call recorded in order, duplicates included.
    pub fn closed_tabs(&self) -> Vec<TabId> {
        self.closed.lock().unwrap().clone()
    }

    pub fn close_count(&self, tab: TabId) -> usize {
        self.closed.lock().unwrap().iter().filter(|t| **t == tab).count()
    }

    pub fn watchers_added(&self) -> usize {
        self.watchers_added.load(Ordering::SeqCst)
    }

    pub fn watchers_removed(&self) -> usize {
        self.watchers_removed.load(Ordering::SeqCst)
    }

    /// Listeners currently registered with the host.
    pub fn open_watchers(&self) -> usize {
        self.watchers.lock().unwrap().len()
    }
}

impl TabHost for MockHost {
    async fn create_tab(&self, url: &str, _active: bool) -> Result<TabId, HostError> {
        let id = TabId(self.next_tab.fetch_add(1, Ordering::SeqCst));
        self.created.lock().unwrap().push((id, url.to_string()));
        Ok(id)
    }

    async fn close_tab(&self, id: TabId) -> Result<(), HostError> {
        let already_closed = self.closed.lock().unwrap().contains(&id);
        let known = self.created.lock().unwrap().iter().any(|(t, _)| *t == id);
        self.closed.lock().unwrap().push(id);
        if already_closed || !known {
            return Err(HostError::TabGone(id));
        }
        Ok(())
    }

    async fn active_tab(&self) -> Result<Option<TabRef>, HostError> {
        Ok(self.active.lock().unwrap().clone())
    }

    fn watch_navigation(&self) -> NavigationWatcher {
        let id = WatcherId(self.next_watcher.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.lock().unwrap().insert(id, tx);
        self.watchers_added.fetch_add(1, Ordering::SeqCst);
        NavigationWatcher::new(id, rx)
    }

    fn unwatch_navigation(&self, id: WatcherId) {
        if self.watchers.lock().unwrap().remove(&id).is_some() {
            self.watchers_removed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn redirect_url(&self) -> String {
        self.redirect.clone()
    }
}

impl PageHost for MockHost {
    async fn cookies_for_domain(&self, domain: &str) -> Result<Vec<CookieRecord>, HostError> {
        Ok(self
            .cookies
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_default())
    }

    async fn storage_snapshot(&self, tab: TabId) -> Result<StorageSnapshot, HostError> {
        if self.deny_storage.load(Ordering::SeqCst) {
            return Err(HostError::ScriptDenied("blocked by page policy".into()));
        }
        self.storage
            .lock()
            .unwrap()
            .get(&tab)
            .cloned()
            .ok_or(HostError::TabGone(tab))
    }

    async fn database_names(&self, tab: TabId) -> Result<Vec<String>, HostError> {
        Ok(self
            .databases
            .lock()
            .unwrap()
            .get(&tab)
            .cloned()
            .unwrap_or_default())
    }
}
