//! Cookie codec for the session store.
//!
//! # Wire format
//!
//! The session travels in a single cookie (default name `pb_auth`) whose
//! value is the percent-encoded JSON object
//! `{"token": "<jwt>", "record": {...} | null}`. Older clients wrote the
//! record under `model`; both keys are read, only `record` is written.
//!
//! Browsers drop cookies larger than 4 KiB, so when the serialized header
//! would exceed [`MAX_COOKIE_SIZE`] the record is cut down to the few fields
//! needed to identify the user.

use cookie::{Cookie, Expiration};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::identity::IdentityRecord;

pub use cookie::SameSite;

/// Default cookie name used by the identity service's client libraries.
pub const DEFAULT_COOKIE_NAME: &str = "pb_auth";

/// Upper bound for a serialized `Set-Cookie` value, in bytes.
pub const MAX_COOKIE_SIZE: usize = 4096;

/// Fields kept when an oversize record has to be trimmed.
const TRIMMED_RECORD_FIELDS: &[&str] = &[
    "id",
    "email",
    "collectionId",
    "collectionName",
    "verified",
];

/// Errors raised while decoding a session cookie.
///
/// Never surfaced to request handlers: a cookie that fails to decode is
/// treated as an unauthenticated session.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("cookie {name} not present")]
    Missing { name: String },
    #[error("cookie payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cookie payload is not a JSON object")]
    NotAnObject,
}

/// Attributes applied to the exported session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    pub domain: Option<String>,
    /// When set, emitted as `Max-Age` alongside `Expires`.
    pub max_age: Option<time::Duration>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            secure: true,
            http_only: true,
            same_site: SameSite::Strict,
            path: "/".to_string(),
            domain: None,
            max_age: None,
        }
    }
}

/// Decoded cookie contents.
#[derive(Debug, Default, PartialEq)]
pub struct SessionPayload {
    pub token: String,
    pub record: Option<IdentityRecord>,
}

#[derive(Deserialize)]
struct StoredPayload {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    record: Option<IdentityRecord>,
    #[serde(default)]
    model: Option<IdentityRecord>,
}

#[derive(Serialize)]
struct OutgoingPayload<'a> {
    token: &'a str,
    record: Option<&'a IdentityRecord>,
}

/// Extracts and decodes the cookie called `name` from a raw `Cookie` header.
///
/// The first well-formed cookie with a matching name wins.
///
/// # Errors
///
/// Returns [`CookieError`] if the cookie is absent or its value is not a
/// JSON object.
pub fn decode_session_cookie(header: &str, name: &str) -> Result<SessionPayload, CookieError> {
    let raw = Cookie::split_parse_encoded(header)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .ok_or_else(|| CookieError::Missing {
            name: name.to_string(),
        })?;

    let json: serde_json::Value = serde_json::from_str(&raw)?;
    if !json.is_object() {
        return Err(CookieError::NotAnObject);
    }
    let stored: StoredPayload = serde_json::from_value(json)?;

    Ok(SessionPayload {
        token: stored.token.unwrap_or_default(),
        record: stored.record.or(stored.model),
    })
}

/// Serializes a session into a `Set-Cookie` header value.
///
/// `expires_at` is the token's `exp` claim in seconds; without one the
/// cookie expires at the Unix epoch, which tells the browser to drop it.
#[must_use]
pub fn encode_session_cookie(
    token: &str,
    record: Option<&IdentityRecord>,
    expires_at: Option<i64>,
    options: &CookieOptions,
    name: &str,
) -> String {
    let expires = expires_at
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);

    let serialized = serialize(name, token, record, expires, options);
    if serialized.len() <= MAX_COOKIE_SIZE {
        return serialized;
    }

    match record {
        Some(record) => {
            let trimmed = record.project(TRIMMED_RECORD_FIELDS);
            tracing::debug!(
                size = serialized.len(),
                fields = record.len(),
                "session cookie too large, trimming identity record"
            );
            serialize(name, token, Some(&trimmed), expires, options)
        }
        None => serialized,
    }
}

fn serialize(
    name: &str,
    token: &str,
    record: Option<&IdentityRecord>,
    expires: OffsetDateTime,
    options: &CookieOptions,
) -> String {
    // Serializing a struct of a string and a string-keyed map cannot fail.
    let value = serde_json::to_string(&OutgoingPayload { token, record }).unwrap_or_default();

    let mut builder = Cookie::build((name.to_string(), value))
        .path(options.path.clone())
        .secure(options.secure)
        .http_only(options.http_only)
        .same_site(options.same_site)
        .expires(Expiration::DateTime(expires));
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(max_age) = options.max_age {
        builder = builder.max_age(max_age);
    }

    builder.build().encoded().to_string()
}
