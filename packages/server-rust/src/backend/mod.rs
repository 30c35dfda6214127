//! Client side of the hosted identity service.
//!
//! The session flow only needs two calls from the service: refreshing an
//! existing token and exchanging a password for a token. Both sit behind
//! [`IdentityBackend`] so the request pipeline can be exercised without a
//! live service.

pub mod pocketbase;

use std::time::Duration;

use async_trait::async_trait;
use landing_core::IdentityRecord;
use serde::Deserialize;

pub use pocketbase::PocketBaseClient;

/// Successful authentication response: a fresh token and the user record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(alias = "model")]
    pub record: IdentityRecord,
}

/// Errors returned by identity service calls.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("identity service unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("identity service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("identity service sent an unexpected response: {0}")]
    InvalidResponse(String),
}

/// Remote identity operations used by the session pipeline.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Re-validates `token` and returns a fresh token and record.
    async fn auth_refresh(&self, token: &str) -> Result<AuthResponse, BackendError>;

    /// Authenticates with an identity (email or username) and password.
    async fn auth_with_password(
        &self,
        identity: &str,
        password: &str,
    ) -> Result<AuthResponse, BackendError>;
}

/// Where and how to reach the identity service.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the service, e.g. `https://auth.example.com`.
    pub base_url: String,
    /// Auth collection holding user records.
    pub collection: String,
    /// Transport timeout applied to every call.
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            collection: "users".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}
