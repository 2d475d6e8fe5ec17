use thiserror::Error;

use crate::tabs::TabId;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("tab {0} no longer exists")]
    TabGone(TabId),

    #[error("in-page script rejected: {0}")]
    ScriptDenied(String),

    #[error("host API error: {0}")]
    Api(String),
}
