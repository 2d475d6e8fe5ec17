use std::fs;
use std::path::PathBuf;

use chrono::{serde::ts_seconds, DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

const EXPIRY_BUFFER: Duration = Duration::minutes(5);
const SESSION_FILE: &str = "session.json";

/// The user the backend attributes captures to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Backend session established by the identity exchange. Lives in durable
/// local storage from login until sign-out or token invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "ts_seconds")]
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

/// Durable local storage for the backend session.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new() -> Result<Self, AuthError> {
        let dir = dirs::config_dir()
            .ok_or_else(|| {
                AuthError::SessionStorage("could not resolve config directory".to_string())
            })?
            .join("hwsync");

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                AuthError::SessionStorage(format!("failed to create config directory: {e}"))
            })?;
        }

        Ok(Self {
            path: dir.join(SESSION_FILE),
        })
    }

    /// Store the session at an explicit path (tests, portable installs).
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, session: &BackendSession) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(session)?;

        fs::write(&self.path, json)
            .map_err(|e| AuthError::SessionStorage(format!("failed to save session: {e}")))?;

        // Owner-only: the file holds live credentials.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)
                .map_err(|e| {
                    AuthError::SessionStorage(format!("failed to read file permissions: {e}"))
                })?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms).map_err(|e| {
                AuthError::SessionStorage(format!("failed to set file permissions: {e}"))
            })?;
        }

        Ok(())
    }

    pub fn load(&self) -> Result<Option<BackendSession>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .map_err(|e| AuthError::SessionStorage(format!("failed to read session: {e}")))?;

        let session: BackendSession = serde_json::from_str(&json)?;
        Ok(Some(session))
    }

    pub fn delete(&self) -> Result<(), AuthError> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| AuthError::SessionStorage(format!("failed to delete session: {e}")))?;
        }
        Ok(())
    }

    /// Treat sessions as expired five minutes early so in-flight requests
    /// don't race the real expiry.
    pub fn is_expired(&self, session: &BackendSession) -> bool {
        session.expires_at <= Utc::now() + EXPIRY_BUFFER
    }
}
