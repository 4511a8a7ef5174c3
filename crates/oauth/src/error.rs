use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the credential layer and the request dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// The credential file is missing or unreadable. Re-seed it.
    #[error("credential store unavailable at {}: {source}", path.display())]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credential file exists but does not hold a valid record. Re-seed it.
    #[error("credential record at {} is corrupt: {source}", path.display())]
    CorruptRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A renewed record could not be written; the previous one is intact.
    #[error("failed to write credential record to {}: {source}", path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cross-process lock guarding renewal could not be taken.
    #[error("failed to lock credential store: {0}")]
    StoreLock(#[source] std::io::Error),

    #[error("access token renewal failed: {0}")]
    RenewalFailed(#[from] RenewalError),

    /// The API server answered 401 to a freshly obtained token.
    #[error("API server rejected the access token for {endpoint}")]
    AuthRejected { endpoint: String },

    #[error("request to {endpoint} failed with HTTP {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("response from {endpoint} is not valid JSON: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid request parameters: {0}")]
    InvalidParams(String),
}

/// Why a refresh-token redemption failed.
#[derive(Debug, Error)]
pub enum RenewalError {
    #[error("authorization server unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("authorization server returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed token response: {0}")]
    MalformedBody(#[source] serde_json::Error),
}

impl Error {
    /// Whether an operator has to re-seed the credential file.
    pub fn needs_reseed(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::CorruptRecord { .. }
        )
    }
}
