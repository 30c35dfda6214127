use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use landing_core::IdentitySnapshot;

use super::handle::SessionHandle;
use crate::error::ApiError;

/// Per-request context installed by the session layer.
///
/// `user` is frozen at bootstrap: logging in or out through `session`
/// during the request changes the exported cookie, not this snapshot.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Live session, for explicit login/logout while handling the request.
    pub session: SessionHandle,
    /// Who the user was when the request arrived.
    pub user: Option<IdentitySnapshot>,
    /// Value of the `x-request-id` header, when one was assigned.
    pub request_id: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(session: SessionHandle, user: Option<IdentitySnapshot>) -> Self {
        Self {
            session,
            user,
            request_id: None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(ApiError::SessionLayerMissing)
    }
}

/// Extractor that only succeeds for requests with a signed-in user.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub IdentitySnapshot);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state).await?;
        ctx.user.map(AuthenticatedUser).ok_or(ApiError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use landing_core::{IdentityRecord, Session};

    use super::*;

    fn parts_with(ctx: Option<RequestContext>) -> Parts {
        let mut request = Request::new(());
        if let Some(ctx) = ctx {
            request.extensions_mut().insert(ctx);
        }
        request.into_parts().0
    }

    fn signed_in() -> RequestContext {
        let record: IdentityRecord = [("id", "u1")].into_iter().collect();
        RequestContext::new(
            SessionHandle::new(Session::new()),
            Some(IdentitySnapshot::capture(&record)),
        )
    }

    #[tokio::test]
    async fn extracts_installed_context() {
        let mut parts = parts_with(Some(signed_in()));
        let ctx = RequestContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(ctx.is_authenticated());
    }

    #[tokio::test]
    async fn missing_layer_is_rejected() {
        let mut parts = parts_with(None);
        let err = RequestContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SessionLayerMissing));
    }

    #[tokio::test]
    async fn authenticated_user_requires_identity() {
        let mut parts = parts_with(Some(signed_in()));
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.id(), Some("u1"));

        let anonymous = RequestContext::new(SessionHandle::new(Session::new()), None);
        let mut parts = parts_with(Some(anonymous));
        let err = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
