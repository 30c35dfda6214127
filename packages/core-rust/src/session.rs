//! The session store: an auth token plus the cached identity record.
//!
//! A [`Session`] is rebuilt from the request cookie, possibly refreshed or
//! cleared, and written back to a cookie when the response leaves. It never
//! talks to the network itself.

use std::fmt;
use std::sync::Arc;

use crate::clock::{ClockSource, SystemClock};
use crate::identity::IdentityRecord;
use crate::session_cookie::{
    decode_session_cookie, encode_session_cookie, CookieError, CookieOptions,
};
use crate::token::{is_token_expired, token_expiry};

/// Auth token and identity record for one client.
#[derive(Clone)]
pub struct Session {
    token: String,
    record: Option<IdentityRecord>,
    clock: Arc<dyn ClockSource>,
}

impl Session {
    /// Creates an empty, unauthenticated session using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty session that checks token expiry against `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            token: String::new(),
            record: None,
            clock,
        }
    }

    /// Builds a session from a raw `Cookie` request header.
    ///
    /// Absent or malformed cookies yield an empty session.
    #[must_use]
    pub fn from_cookie(header: &str, name: &str, clock: Arc<dyn ClockSource>) -> Self {
        let mut session = Self::with_clock(clock);
        session.load_from_cookie(header, name);
        session
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn record(&self) -> Option<&IdentityRecord> {
        self.record.as_ref()
    }

    /// Mutable access to the cached record, if there is one.
    pub fn record_mut(&mut self) -> Option<&mut IdentityRecord> {
        self.record.as_mut()
    }

    /// Whether the token is present and not expired.
    ///
    /// Only the token's own claims are consulted; the identity service may
    /// still reject it on refresh.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !is_token_expired(&self.token, self.clock.as_ref())
    }

    /// Replaces the token and record.
    pub fn save(&mut self, token: impl Into<String>, record: Option<IdentityRecord>) {
        self.token = token.into();
        self.record = record;
    }

    /// Drops the token and record.
    pub fn clear(&mut self) {
        self.token.clear();
        self.record = None;
    }

    /// Replaces this session's state with the contents of the cookie `name`
    /// in the raw `Cookie` header. Clears the session if the cookie is
    /// missing or unreadable.
    pub fn load_from_cookie(&mut self, header: &str, name: &str) {
        match self.try_load_from_cookie(header, name) {
            Ok(()) => {}
            Err(CookieError::Missing { .. }) => self.clear(),
            Err(e) => {
                tracing::debug!(error = %e, cookie = name, "discarding unreadable session cookie");
                self.clear();
            }
        }
    }

    /// Like [`Session::load_from_cookie`] but reports why decoding failed.
    /// The session is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`CookieError`] if the cookie is missing or its payload is
    /// not a JSON object.
    pub fn try_load_from_cookie(&mut self, header: &str, name: &str) -> Result<(), CookieError> {
        let payload = decode_session_cookie(header, name)?;
        self.save(payload.token, payload.record);
        Ok(())
    }

    /// Serializes the session into a `Set-Cookie` header value.
    ///
    /// The cookie expires with the token; an empty or unauthenticated
    /// session produces a cookie that expires immediately.
    #[must_use]
    pub fn export_to_cookie(&self, options: &CookieOptions, name: &str) -> String {
        encode_session_cookie(
            &self.token,
            self.record.as_ref(),
            token_expiry(&self.token),
            options,
            name,
        )
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token && self.record == other.record
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}
