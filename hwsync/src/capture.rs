use std::sync::Arc;

use hwsync_host::{HostError, PageHost, StorageSnapshot, TabHost, TabId, TabRef};
use hwsync_store::SessionPayload;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("cannot capture from {0}")]
    InvalidUrl(String),

    #[error("host error: {0}")]
    Host(#[from] HostError),
}

/// Gathers one site's authentication artifacts from a tab: the cookie jar
/// scoped to the tab's hostname, detached storage snapshots, and the names
/// of client-side databases.
pub struct SessionCapture<H> {
    host: Arc<H>,
}

impl<H> SessionCapture<H>
where
    H: PageHost + TabHost + Send + Sync,
{
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }

    /// Capture a fresh payload for `tab`.
    ///
    /// Content-script callers only know their URL; without a tab id the
    /// active tab stands in for storage extraction, and if none can be
    /// found the payload ships with an empty snapshot rather than failing.
    /// A denied storage script likewise degrades to a partial payload.
    pub async fn capture(&self, tab: &TabRef) -> Result<SessionPayload, CaptureError> {
        let url = Url::parse(&tab.url).map_err(|_| CaptureError::InvalidUrl(tab.url.clone()))?;
        let hostname = url
            .host_str()
            .ok_or_else(|| CaptureError::InvalidUrl(tab.url.clone()))?
            .to_string();

        let cookies = self.host.cookies_for_domain(&hostname).await?;

        let (storage, databases) = match self.resolve_target(tab).await {
            Some(target) => self.page_artifacts(target).await,
            None => {
                tracing::warn!(url = %tab.url, "no tab available for storage extraction");
                (StorageSnapshot::empty(), Vec::new())
            }
        };

        tracing::debug!(
            %hostname,
            cookies = cookies.len(),
            databases = databases.len(),
            "captured session"
        );
        Ok(SessionPayload::new(
            cookies,
            storage,
            databases,
            tab.url.clone(),
        ))
    }

    async fn resolve_target(&self, tab: &TabRef) -> Option<TabId> {
        if tab.id.is_some() {
            return tab.id;
        }
        match self.host.active_tab().await {
            Ok(active) => active.and_then(|t| t.id),
            Err(e) => {
                tracing::warn!(error = %e, "active tab lookup failed");
                None
            }
        }
    }

    async fn page_artifacts(&self, target: TabId) -> (StorageSnapshot, Vec<String>) {
        let storage = match self.host.storage_snapshot(target).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(tab = %target, error = %e, "storage snapshot failed");
                StorageSnapshot::empty()
            }
        };

        let databases = match self.host.database_names(target).await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(tab = %target, error = %e, "database enumeration failed");
                Vec::new()
            }
        };

        (storage, databases)
    }
}
