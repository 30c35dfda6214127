//! Account endpoints: who am I, password login, and logout.
//!
//! Login and logout only touch the request's live session; the session
//! layer turns the result into the response cookie.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use landing_core::IdentitySnapshot;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::AppState;
use crate::error::ApiError;
use crate::session::{AuthenticatedUser, RequestContext};

/// Password login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    pub identity: String,
    pub password: String,
}

/// `GET /api/me` -- the user the request arrived with, or `null`.
pub async fn me_handler(ctx: RequestContext) -> Json<serde_json::Value> {
    Json(json!({ "user": ctx.user }))
}

/// `GET /api/account` -- signed-in users only.
pub async fn account_handler(AuthenticatedUser(user): AuthenticatedUser) -> Json<IdentitySnapshot> {
    Json(user)
}

/// `POST /api/auth/login` -- exchanges credentials for a session.
pub async fn login_handler(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let auth = state
        .backend
        .auth_with_password(&body.identity, &body.password)
        .await?;

    info!(
        user_id = auth.record.id().unwrap_or_default(),
        request_id = ctx.request_id.as_deref().unwrap_or_default(),
        "user signed in"
    );
    let user = IdentitySnapshot::capture(&auth.record);
    ctx.session.save(auth.token, Some(auth.record));

    Ok(Json(json!({ "user": user })))
}

/// `POST /api/auth/logout` -- signs the session out.
pub async fn logout_handler(ctx: RequestContext) -> StatusCode {
    if let Some(user) = &ctx.user {
        info!(
            user_id = user.id().unwrap_or_default(),
            request_id = ctx.request_id.as_deref().unwrap_or_default(),
            "user signed out"
        );
    }
    ctx.session.clear();
    StatusCode::NO_CONTENT
}
