use std::{io::ErrorKind, sync::Arc, time::Duration};

use {
    qtrade_config::QtradeConfig,
    tokio::sync::Mutex,
    tracing::{debug, error, info},
};

use crate::{
    error::{Error, Result},
    redeem::TokenEndpoint,
    storage::{CredentialStore, TokenStore},
    types::{AccessData, CredentialStatus, now_secs},
};

/// Poll interval while another process holds the store lock.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Hands out a valid `(access_token, api_server)` pair, redeeming the refresh
/// token when the stored access token has expired.
///
/// Redemption is single-flight: callers that find the token expired queue on
/// an in-process mutex and, when the store supports it, an advisory file lock
/// shared with other processes. The record is re-read once both are held, so
/// everyone behind the first caller picks up its result instead of spending
/// the (already rotated) refresh token again.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    endpoint: TokenEndpoint,
    pub(crate) http: reqwest::Client,
    expiry_skew: u64,
    renewal_margin: u64,
    renewal: Mutex<()>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn CredentialStore>, endpoint: TokenEndpoint) -> Self {
        Self {
            store,
            http: endpoint.client().clone(),
            endpoint,
            expiry_skew: 5,
            renewal_margin: 30,
            renewal: Mutex::new(()),
        }
    }

    /// Build a manager over the file store and token endpoint named by `config`.
    pub fn from_config(config: &QtradeConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.http.timeout_secs));
        if let Some(ua) = &config.http.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        let endpoint = TokenEndpoint::new(builder.build()?, config.auth.token_url()).with_retry(
            config.auth.max_attempts,
            Duration::from_millis(config.auth.retry_backoff_ms),
        );

        Ok(Self::new(Arc::new(TokenStore::from_config(config)), endpoint)
            .with_expiry_skew(config.auth.expiry_skew_secs)
            .with_renewal_margin(config.auth.renewal_margin_secs))
    }

    /// Treat cached access tokens as expired `secs` early.
    pub fn with_expiry_skew(mut self, secs: u64) -> Self {
        self.expiry_skew = secs;
        self
    }

    /// Shorten each renewed token's lifetime by `secs`.
    pub fn with_renewal_margin(mut self, secs: u64) -> Self {
        self.renewal_margin = secs;
        self
    }

    /// Current access token and the server it belongs to. Only touches the
    /// network when the stored token has expired.
    pub async fn get_access_data(&self) -> Result<AccessData> {
        let record = self.store.load()?;
        if record.is_fresh(now_secs(), self.expiry_skew) {
            return Ok(record.access_data());
        }
        self.renew_exclusive(false).await
    }

    /// Redeem the refresh token now, whether or not the access token expired.
    pub async fn renew(&self) -> Result<AccessData> {
        self.renew_exclusive(true).await
    }

    /// Stored expiry and server, without any network traffic.
    pub fn status(&self) -> Result<CredentialStatus> {
        let record = self.store.load()?;
        let now = now_secs();
        Ok(CredentialStatus {
            remaining_secs: record
                .is_fresh(now, 0)
                .then(|| record.expires_at - now),
            api_server: record.api_server,
            expires_at: record.expires_at,
        })
    }

    async fn renew_exclusive(&self, force: bool) -> Result<AccessData> {
        let _in_process = self.renewal.lock().await;

        let Some(mut file_lock) = self.store.lock_file()? else {
            return self.renew_locked(force).await;
        };
        loop {
            match file_lock.try_write() {
                Ok(_cross_process) => return self.renew_locked(force).await,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {},
                Err(e) => return Err(Error::StoreLock(e)),
            }
            debug!("credential store locked by another process, waiting");
            tokio::time::sleep(LOCK_POLL_INTERVAL).await;
        }
    }

    /// Read-check-redeem-write. Callers must hold both renewal locks.
    async fn renew_locked(&self, force: bool) -> Result<AccessData> {
        let record = self.store.load()?;
        if !force && record.is_fresh(now_secs(), self.expiry_skew) {
            debug!(
                api_server = %record.api_server,
                "reusing credentials renewed by another caller"
            );
            return Ok(record.access_data());
        }

        info!(token_url = %self.endpoint.url(), "redeeming refresh token");
        let renewed = self
            .endpoint
            .redeem(&record.refresh_token)
            .await?
            .into_record(now_secs(), self.renewal_margin);

        if let Err(e) = self.store.save(&renewed) {
            error!(
                error = %e,
                "renewed credentials could not be saved, the old refresh token is spent"
            );
            return Err(e);
        }

        info!(
            api_server = %renewed.api_server,
            expires_at = renewed.expires_at,
            "access token renewed"
        );
        Ok(renewed.access_data())
    }
}
