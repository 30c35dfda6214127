//! Tower middleware wiring the bootstrapper and exporter around a service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, Request, Response};
use landing_core::ClockSource;
use tower::{Layer, Service};

use super::bootstrap::SessionBootstrapper;
use super::config::SessionConfig;
use super::export::SessionExporter;
use crate::backend::IdentityBackend;

// ---------------------------------------------------------------------------
// SessionLayer
// ---------------------------------------------------------------------------

/// Tower layer that gives every request a session and every response its cookie.
///
/// On the way in it bootstraps a [`RequestContext`](super::RequestContext)
/// into the request extensions; on the way out it appends the session's
/// `Set-Cookie` header, after the inner service (and any login or logout it
/// performed) has finished.
#[derive(Clone)]
pub struct SessionLayer {
    bootstrapper: Arc<SessionBootstrapper>,
    exporter: Arc<SessionExporter>,
}

impl SessionLayer {
    #[must_use]
    pub fn new(backend: Arc<dyn IdentityBackend>, config: SessionConfig) -> Self {
        let config = Arc::new(config);
        Self {
            bootstrapper: Arc::new(SessionBootstrapper::new(backend, Arc::clone(&config))),
            exporter: Arc::new(SessionExporter::new(config)),
        }
    }

    /// Like [`SessionLayer::new`] with an explicit clock for token expiry.
    #[must_use]
    pub fn with_clock(
        backend: Arc<dyn IdentityBackend>,
        config: SessionConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            bootstrapper: Arc::new(SessionBootstrapper::with_clock(
                backend,
                Arc::clone(&config),
                clock,
            )),
            exporter: Arc::new(SessionExporter::new(config)),
        }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            bootstrapper: Arc::clone(&self.bootstrapper),
            exporter: Arc::clone(&self.exporter),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionService
// ---------------------------------------------------------------------------

/// Service wrapper produced by [`SessionLayer`].
#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    bootstrapper: Arc<SessionBootstrapper>,
    exporter: Arc<SessionExporter>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SessionService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // The clone may not be ready; keep the instance poll_ready was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let bootstrapper = Arc::clone(&self.bootstrapper);
        let exporter = Arc::clone(&self.exporter);

        Box::pin(async move {
            let cookie_header = join_cookie_headers(req.headers());
            let request_id = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let ctx = bootstrapper
                .bootstrap(cookie_header.as_deref(), request_id)
                .await;

            let session = ctx.session.clone();
            req.extensions_mut().insert(ctx);

            let mut response = inner.call(req).await?;
            exporter.export(&session, response.headers_mut());
            Ok(response)
        })
    }
}

/// Joins every `Cookie` header into one (HTTP/2 clients may split them).
fn join_cookie_headers(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
