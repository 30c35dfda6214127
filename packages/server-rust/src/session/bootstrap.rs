//! Rebuilds the session at the start of a request.
//!
//! 1. Decode the session cookie (absent or malformed -> empty session)
//! 2. If the token still looks valid, refresh it against the identity service
//! 3. Any refresh failure clears the session instead of failing the request
//! 4. Snapshot the resulting user into the request context
//!
//! Nothing in here returns an error: every failure path ends as "no user".

use std::sync::Arc;

use landing_core::{ClockSource, IdentitySnapshot, Session, SystemClock};
use tracing::{debug, debug_span, warn, Instrument};

use super::config::SessionConfig;
use super::context::RequestContext;
use super::handle::SessionHandle;
use crate::backend::{BackendError, IdentityBackend};

/// How a request's session ended up after bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No session token was presented.
    Anonymous,
    /// A token was presented but had already expired locally; not sent for refresh.
    Expired,
    /// The identity service accepted and refreshed the token.
    Refreshed,
    /// The identity service refused the token.
    Rejected,
    /// The identity service could not be reached.
    Unreachable,
    /// The identity service answered with something unusable.
    InvalidResponse,
}

impl BootstrapOutcome {
    /// Label used for the `outcome` metric dimension.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapOutcome::Anonymous => "anonymous",
            BootstrapOutcome::Expired => "expired",
            BootstrapOutcome::Refreshed => "refreshed",
            BootstrapOutcome::Rejected => "rejected",
            BootstrapOutcome::Unreachable => "unreachable",
            BootstrapOutcome::InvalidResponse => "invalid_response",
        }
    }

    #[must_use]
    pub fn is_authenticated(self) -> bool {
        self == BootstrapOutcome::Refreshed
    }
}

impl From<&BackendError> for BootstrapOutcome {
    fn from(err: &BackendError) -> Self {
        match err {
            BackendError::Transport(_) => BootstrapOutcome::Unreachable,
            BackendError::Rejected { .. } => BootstrapOutcome::Rejected,
            BackendError::InvalidResponse(_) => BootstrapOutcome::InvalidResponse,
        }
    }
}

/// Produces the [`RequestContext`] for each incoming request.
pub struct SessionBootstrapper {
    backend: Arc<dyn IdentityBackend>,
    config: Arc<SessionConfig>,
    clock: Arc<dyn ClockSource>,
}

impl SessionBootstrapper {
    #[must_use]
    pub fn new(backend: Arc<dyn IdentityBackend>, config: Arc<SessionConfig>) -> Self {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Uses `clock` for token expiry checks instead of the system clock.
    #[must_use]
    pub fn with_clock(
        backend: Arc<dyn IdentityBackend>,
        config: Arc<SessionConfig>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        Self {
            backend,
            config,
            clock,
        }
    }

    /// Builds the request context from the raw `Cookie` header, if any.
    ///
    /// `request_id` tags the bootstrap log events and is carried into the
    /// context for handlers.
    pub async fn bootstrap(
        &self,
        cookie_header: Option<&str>,
        request_id: Option<String>,
    ) -> RequestContext {
        let mut session = Session::from_cookie(
            cookie_header.unwrap_or_default(),
            &self.config.cookie_name,
            Arc::clone(&self.clock),
        );

        let span = debug_span!(
            "session_bootstrap",
            request_id = request_id.as_deref().unwrap_or_default()
        );
        let outcome = self.restore(&mut session).instrument(span).await;
        metrics::counter!("session_bootstrap_total", "outcome" => outcome.as_str()).increment(1);

        let user = IdentitySnapshot::capture_optional(session.record());
        let mut ctx = RequestContext::new(SessionHandle::new(session), user);
        ctx.request_id = request_id;
        ctx
    }

    /// Refreshes or clears `session` in place.
    ///
    /// Sessions that are not valid are cleared without contacting the
    /// identity service, so an unverified record from the cookie never
    /// reaches a handler.
    pub async fn restore(&self, session: &mut Session) -> BootstrapOutcome {
        if session.token().is_empty() {
            session.clear();
            return BootstrapOutcome::Anonymous;
        }

        if !session.is_valid() {
            debug!("session token expired, clearing");
            session.clear();
            return BootstrapOutcome::Expired;
        }

        match self.backend.auth_refresh(session.token()).await {
            Ok(auth) => {
                debug!(user_id = auth.record.id().unwrap_or_default(), "session refreshed");
                session.save(auth.token, Some(auth.record));
                BootstrapOutcome::Refreshed
            }
            Err(err) => {
                let outcome = BootstrapOutcome::from(&err);
                match outcome {
                    BootstrapOutcome::Unreachable => {
                        warn!(
                            error = %err,
                            "identity service unreachable, treating request as signed out"
                        );
                    }
                    _ => debug!(error = %err, "session refresh failed, clearing"),
                }
                session.clear();
                outcome
            }
        }
    }
}
