use std::time::{SystemTime, UNIX_EPOCH};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize, Serializer},
};

/// Serialize a `Secret<String>` as its plain value. Only used for the
/// credential file, which is written with owner-only permissions.
pub fn serialize_secret<S: Serializer>(secret: &Secret<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(secret.expose_secret())
}

/// Current unix time in seconds.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// The single persisted credential set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,
    #[serde(serialize_with = "serialize_secret")]
    pub refresh_token: Secret<String>,
    /// Base URL the access token must be presented to.
    pub api_server: String,
    /// Unix seconds after which `access_token` must not be used.
    pub expires_at: u64,
}

impl CredentialRecord {
    /// A record carrying only a manually obtained refresh token. Its access
    /// token is already expired, so the first use redeems the refresh token.
    pub fn seed(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(String::new()),
            refresh_token: Secret::new(refresh_token.into()),
            api_server: String::new(),
            expires_at: 0,
        }
    }

    /// Whether the access token is still usable at `now`, treating it as
    /// expired `skew` seconds early.
    pub fn is_fresh(&self, now: u64, skew: u64) -> bool {
        !self.access_token.expose_secret().is_empty() && now.saturating_add(skew) < self.expires_at
    }

    pub fn access_data(&self) -> AccessData {
        AccessData {
            access_token: self.access_token.clone(),
            api_server: self.api_server.clone(),
        }
    }
}

impl PartialEq for CredentialRecord {
    fn eq(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.refresh_token.expose_secret() == other.refresh_token.expose_secret()
            && self.api_server == other.api_server
            && self.expires_at == other.expires_at
    }
}

impl Eq for CredentialRecord {}

/// An access token together with the server it was issued for.
#[derive(Debug, Clone)]
pub struct AccessData {
    pub access_token: Secret<String>,
    pub api_server: String,
}

impl PartialEq for AccessData {
    fn eq(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.api_server == other.api_server
    }
}

impl Eq for AccessData {}

/// Body returned by the token endpoint on a successful redemption.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
    pub api_server: String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
}

impl TokenResponse {
    /// Turn the relative lifetime into an absolute expiry, shortened by
    /// `margin` seconds.
    pub fn into_record(self, now: u64, margin: u64) -> CredentialRecord {
        CredentialRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            api_server: self.api_server,
            expires_at: now.saturating_add(self.expires_in.saturating_sub(margin)),
        }
    }
}

/// What is known about the stored credentials without contacting anyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStatus {
    pub api_server: String,
    pub expires_at: u64,
    /// Seconds of validity left, `None` once expired (or never redeemed).
    pub remaining_secs: Option<u64>,
}
