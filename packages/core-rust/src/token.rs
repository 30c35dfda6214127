//! Inspection of identity-service auth tokens.
//!
//! Tokens are JWTs signed by the identity service. This side holds no key,
//! so signatures are never checked here: the service re-validates the token
//! on refresh. Only the payload claims are read, to decide whether a token
//! is worth sending for refresh at all.

use std::collections::BTreeMap;

use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::clock::ClockSource;

/// Claims carried in an auth token payload.
///
/// Every claim is optional; unknown claims are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Identifier of the record the token was issued for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Token kind, e.g. `"auth"`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Collection the record belongs to.
    #[serde(default, rename = "collectionId", skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TokenClaims {
    /// Returns `true` when the payload carried no claims at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exp.is_none()
            && self.id.is_none()
            && self.token_type.is_none()
            && self.collection_id.is_none()
            && self.extra.is_empty()
    }
}

/// Decodes the payload of `token` without verifying its signature.
///
/// Returns `None` for an empty token or anything that is not a
/// well-formed JWT.
#[must_use]
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    if token.is_empty() {
        return None;
    }

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::trace!(error = %e, "auth token payload could not be decoded");
            None
        }
    }
}

/// Reports whether `token` is expired at the clock's current time.
///
/// A token counts as expired when it is empty, undecodable, carries no
/// claims, or has an `exp` at or before now. A decodable token without an
/// `exp` claim never expires.
#[must_use]
pub fn is_token_expired(token: &str, clock: &dyn ClockSource) -> bool {
    let Some(claims) = decode_claims(token) else {
        return true;
    };
    if claims.is_empty() {
        return true;
    }
    match claims.exp {
        None => false,
        Some(exp) => {
            let now_ms = i64::try_from(clock.now()).unwrap_or(i64::MAX);
            exp.saturating_mul(1000) <= now_ms
        }
    }
}

/// Returns the token's `exp` claim, if it has one.
#[must_use]
pub fn token_expiry(token: &str) -> Option<i64> {
    decode_claims(token).and_then(|claims| claims.exp)
}
