use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::error::AuthError;
use crate::redirect::AuthTokenPair;
use crate::session::{BackendSession, SessionUser};

const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const SESSION_LIFETIME_SECS: i64 = 3600;

/// Identity layer the bridge talks to: provisions the authorization URL and
/// exchanges redirect tokens for a backend session.
pub trait IdentityApi {
    fn authorize_url(&self, redirect_to: &str) -> Result<String, AuthError>;

    fn establish_session(
        &self,
        tokens: &AuthTokenPair,
    ) -> impl std::future::Future<Output = Result<BackendSession, AuthError>> + Send;
}

/// GoTrue-style identity endpoint of the backend.
pub struct RestIdentity {
    http: Client,
    identity_url: String,
    api_key: String,
    provider: String,
}

impl RestIdentity {
    pub fn new(identity_url: &str, api_key: &str, provider: &str) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            identity_url: identity_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            provider: provider.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl IdentityApi for RestIdentity {
    fn authorize_url(&self, redirect_to: &str) -> Result<String, AuthError> {
        // Offline access + forced consent so a refresh token is issued on
        // every login, not just the first.
        let url = Url::parse_with_params(
            &format!("{}/authorize", self.identity_url),
            &[
                ("provider", self.provider.as_str()),
                ("redirect_to", redirect_to),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::Configuration(format!("invalid identity URL: {e}")))?;

        Ok(url.to_string())
    }

    async fn establish_session(
        &self,
        tokens: &AuthTokenPair,
    ) -> Result<BackendSession, AuthError> {
        let resp = self
            .http
            .get(format!("{}/user", self.identity_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&tokens.access_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("{status}: {detail}")));
        }

        let user: UserInfo = resp.json().await?;
        tracing::debug!(user_id = %user.id, "identity exchange succeeded");

        Ok(BackendSession {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: Utc::now() + Duration::seconds(SESSION_LIFETIME_SECS),
            user: SessionUser {
                id: user.id,
                email: user.email,
            },
        })
    }
}
