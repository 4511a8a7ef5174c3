//! Credential lifecycle for the Questrade API: persisted token record,
//! expiry-aware single-flight renewal and authenticated request dispatch.

pub mod error;
pub mod invoke;
pub mod manager;
pub mod redeem;
pub mod storage;
pub mod types;

pub use {
    error::{Error, RenewalError, Result},
    invoke::HttpMethod,
    manager::CredentialManager,
    redeem::TokenEndpoint,
    storage::{CredentialStore, TokenStore},
    types::{AccessData, CredentialRecord, CredentialStatus, TokenResponse, serialize_secret},
};
