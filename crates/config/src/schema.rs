/// Config schema types (authorization server, credential store, HTTP client).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default authorization host for refresh-token redemption.
pub const DEFAULT_AUTH_HOST: &str = "https://login.questrade.com";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QtradeConfig {
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
}

/// Authorization server and renewal policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Scheme + host of the authorization server.
    pub auth_host: String,

    /// Path of the token endpoint on `auth_host`.
    pub token_path: String,

    /// A cached access token is treated as expired this many seconds early.
    pub expiry_skew_secs: u64,

    /// Subtracted from the issuer's `expires_in` when a token is renewed.
    pub renewal_margin_secs: u64,

    /// Attempts for a redemption that fails before reaching the server.
    pub max_attempts: u32,

    /// Initial backoff between those attempts; doubles each time.
    pub retry_backoff_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_host: DEFAULT_AUTH_HOST.to_string(),
            token_path: "/oauth2/token".to_string(),
            expiry_skew_secs: 5,
            renewal_margin_secs: 30,
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl AuthConfig {
    /// Full URL of the token endpoint.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}",
            self.auth_host.trim_end_matches('/'),
            self.token_path.trim_start_matches('/')
        )
    }
}

/// Where the credential record lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Explicit path to the credential file. Defaults to
    /// `~/.config/qtrade/credentials.json`.
    pub path: Option<PathBuf>,
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_url_joins_host_and_path() {
        let mut auth = AuthConfig::default();
        assert_eq!(auth.token_url(), "https://login.questrade.com/oauth2/token");

        auth.auth_host = "http://127.0.0.1:9000/".into();
        auth.token_path = "oauth2/token".into();
        assert_eq!(auth.token_url(), "http://127.0.0.1:9000/oauth2/token");
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let cfg: QtradeConfig = toml::from_str("[auth]\nmax_attempts = 5\n").unwrap();
        assert_eq!(cfg.auth.max_attempts, 5);
        assert_eq!(cfg.auth.renewal_margin_secs, 30);
        assert_eq!(cfg.http.timeout_secs, 30);
        assert!(cfg.store.path.is_none());
    }
}
