use config::{Config, ConfigError, File};
use serde::Deserialize;

/// Deployment configuration, resolved at process start. Nothing in the
/// subsystem hard-codes endpoints or identities; everything arrives here,
/// from an optional TOML file plus `HWSYNC`-prefixed environment overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub store: StoreSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub identity_url: String,
    pub api_key: String,

    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_flow_timeout")]
    pub flow_timeout_secs: u64,
}

fn default_provider() -> String {
    "google".to_string()
}

fn default_flow_timeout() -> u64 {
    300
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("HWSYNC_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let settings = Config::builder()
            .add_source(File::with_name(&config_path).required(false))
            .add_source(config::Environment::with_prefix("HWSYNC").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.store.base_url.starts_with("http") {
            return Err("store.base_url must be a valid HTTP(S) URL".to_string());
        }
        if self.store.api_key.is_empty() {
            return Err("store.api_key is required".to_string());
        }
        if !self.auth.identity_url.starts_with("http") {
            return Err("auth.identity_url must be a valid HTTP(S) URL".to_string());
        }
        if self.auth.flow_timeout_secs == 0 {
            return Err("auth.flow_timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}
