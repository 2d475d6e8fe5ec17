use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("session storage error: {0}")]
    SessionStorage(String),

    #[error("no usable tokens in redirect: {0}")]
    TokenExtraction(String),

    #[error("token exchange rejected: {0}")]
    Exchange(String),

    #[error("authentication timed out")]
    Timeout,

    #[error("host error: {0}")]
    Host(#[from] hwsync_host::HostError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
