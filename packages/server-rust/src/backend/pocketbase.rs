//! HTTP client for a PocketBase-compatible identity service.
//!
//! Endpoints used, relative to the configured base URL:
//! - `POST /api/collections/{collection}/auth-refresh` with the token in
//!   `Authorization`
//! - `POST /api/collections/{collection}/auth-with-password` with a JSON
//!   `{identity, password}` body
//!
//! Both answer `{token, record}` on success and `{code, message, data}` on
//! failure.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AuthResponse, BackendConfig, BackendError, IdentityBackend};

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct PasswordRequest<'a> {
    identity: &'a str,
    password: &'a str,
}

/// Identity backend backed by a shared `reqwest::Client`.
///
/// Holds no per-user state, so one instance serves every request.
#[derive(Debug, Clone)]
pub struct PocketBaseClient {
    http: reqwest::Client,
    base_url: String,
    collection: String,
}

impl PocketBaseClient {
    /// Builds a client with the configured transport timeout.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the HTTP client cannot be
    /// constructed (e.g., TLS backend initialisation fails).
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(BackendError::Transport)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        })
    }

    fn collection_url(&self, action: &str) -> String {
        format!(
            "{}/api/collections/{}/{}",
            self.base_url, self.collection, action
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<AuthResponse, BackendError> {
        let response = request.send().await.map_err(BackendError::Transport)?;
        let status = response.status();

        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) if !body.message.is_empty() => body.message,
                _ => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        if auth.token.is_empty() {
            return Err(BackendError::InvalidResponse(
                "response carried an empty token".to_string(),
            ));
        }
        Ok(auth)
    }
}

#[async_trait]
impl IdentityBackend for PocketBaseClient {
    async fn auth_refresh(&self, token: &str) -> Result<AuthResponse, BackendError> {
        debug!(collection = %self.collection, "refreshing auth token");
        let request = self
            .http
            .post(self.collection_url("auth-refresh"))
            .header(AUTHORIZATION, token);
        self.send(request).await
    }

    async fn auth_with_password(
        &self,
        identity: &str,
        password: &str,
    ) -> Result<AuthResponse, BackendError> {
        debug!(collection = %self.collection, "authenticating with password");
        let request = self
            .http
            .post(self.collection_url("auth-with-password"))
            .json(&PasswordRequest { identity, password });
        self.send(request).await
    }
}
