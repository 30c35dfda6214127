//! Writes the session back to the client once the response is ready.

use std::sync::Arc;

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use landing_core::Session;
use tracing::error;

use super::config::SessionConfig;
use super::handle::SessionHandle;

/// Appends the session's `Set-Cookie` header to outgoing responses.
#[derive(Debug, Clone)]
pub struct SessionExporter {
    config: Arc<SessionConfig>,
}

impl SessionExporter {
    #[must_use]
    pub fn new(config: Arc<SessionConfig>) -> Self {
        Self { config }
    }

    /// Appends exactly one `Set-Cookie` header describing `session`.
    ///
    /// Signed-out sessions produce an already-expired cookie so the
    /// browser drops whatever it had stored.
    pub fn export(&self, session: &SessionHandle, headers: &mut HeaderMap) {
        let cookie =
            session.export_to_cookie(&self.config.cookie_options, &self.config.cookie_name);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => {
                error!(error = %e, "session cookie is not a valid header value, clearing instead");
                self.export_cleared(headers);
            }
        }
    }

    fn export_cleared(&self, headers: &mut HeaderMap) {
        let cookie = Session::new()
            .export_to_cookie(&self.config.cookie_options, &self.config.cookie_name);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => error!(
                error = %e,
                cookie = %self.config.cookie_name,
                "cookie name is not header-safe"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use cookie::Cookie;
    use landing_core::{IdentityRecord, Session};

    use super::*;
    use crate::session::bootstrap::tests::{alice, valid_token};

    fn exporter() -> SessionExporter {
        SessionExporter::new(Arc::new(SessionConfig::default()))
    }

    fn set_cookies(headers: &HeaderMap) -> Vec<Cookie<'static>> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| Cookie::parse_encoded(v.to_str().unwrap().to_string()).unwrap())
            .collect()
    }

    #[test]
    fn signed_in_session_exports_token() {
        let handle = SessionHandle::new(Session::new());
        handle.save(valid_token(), Some(alice()));

        let mut headers = HeaderMap::new();
        exporter().export(&handle, &mut headers);

        let cookies = set_cookies(&headers);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), "pb_auth");
        let payload: serde_json::Value = serde_json::from_str(cookies[0].value()).unwrap();
        assert_eq!(payload["token"], valid_token());
        assert_eq!(payload["record"]["name"], "Alice");
    }

    #[test]
    fn signed_out_session_exports_clearing_cookie() {
        let handle = SessionHandle::new(Session::new());
        let mut headers = HeaderMap::new();
        exporter().export(&handle, &mut headers);

        let cookies = set_cookies(&headers);
        assert_eq!(cookies.len(), 1);
        assert_eq!(
            cookies[0].expires_datetime(),
            Some(time::OffsetDateTime::UNIX_EPOCH)
        );
    }

    #[test]
    fn appends_alongside_existing_cookies() {
        let handle = SessionHandle::new(Session::new());
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark"));

        exporter().export(&handle, &mut headers);
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn reflects_mutation_after_bootstrap() {
        let handle = SessionHandle::new(Session::new());
        handle.save(valid_token(), Some(alice()));
        handle.with_record_mut(|record: &mut IdentityRecord| record.insert("name", "Alicia"));

        let mut headers = HeaderMap::new();
        exporter().export(&handle, &mut headers);
        let cookies = set_cookies(&headers);
        let payload: serde_json::Value = serde_json::from_str(cookies[0].value()).unwrap();
        assert_eq!(payload["record"]["name"], "Alicia");
    }
}
