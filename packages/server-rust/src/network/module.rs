//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown. Binding before serving
//! lets callers learn the OS-assigned port first.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    account_handler, health_handler, liveness_handler, login_handler, logout_handler, me_handler,
    readiness_handler, AppState,
};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::backend::IdentityBackend;
use crate::session::{SessionConfig, SessionLayer};

/// Manages the HTTP server lifecycle.
///
/// 1. `new()` -- allocates the shutdown controller and session layer
/// 2. `start()` -- binds the TCP listener
/// 3. `serve()` -- serves until the shutdown future resolves, then drains
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    backend: Arc<dyn IdentityBackend>,
    session_layer: SessionLayer,
}

impl NetworkModule {
    /// Creates a module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        session: SessionConfig,
        backend: Arc<dyn IdentityBackend>,
    ) -> Self {
        let session_layer = SessionLayer::new(Arc::clone(&backend), session);
        Self::with_session_layer(config, backend, session_layer)
    }

    /// Creates a module around a pre-built session layer.
    #[must_use]
    pub fn with_session_layer(
        config: NetworkConfig,
        backend: Arc<dyn IdentityBackend>,
        session_layer: SessionLayer,
    ) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            backend,
            session_layer,
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready` -- probes
    /// - `GET /api/me` -- current user or `null`
    /// - `GET /api/account` -- current user, 401 when signed out
    /// - `POST /api/auth/login` -- password login
    /// - `POST /api/auth/logout` -- sign out
    ///
    /// Every route sits behind the session layer, so every response carries
    /// the session cookie.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            shutdown: Arc::clone(&self.shutdown),
            backend: Arc::clone(&self.backend),
            start_time: Instant::now(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/api/me", get(me_handler))
            .route("/api/account", get(account_handler))
            .route("/api/auth/login", post(login_handler))
            .route("/api/auth/logout", post(logout_handler))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.config.request_timeout,
            ))
            .layer(self.session_layer.clone())
            .layer(axum::middleware::from_fn_with_state(
                Arc::clone(&self.shutdown),
                track_in_flight,
            ))
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until `shutdown` resolves, then drains.
    ///
    /// After the signal the health state moves to Draining, the server waits
    /// up to `drain_timeout` for in-flight requests, then moves to Stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .expect("start() must be called before serve()");
        let router = self.build_router();
        let shutdown_ctrl = Arc::clone(&self.shutdown);
        let signal_ctrl = Arc::clone(&self.shutdown);

        shutdown_ctrl.set_ready();
        info!("Serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                signal_ctrl.trigger_shutdown();
            })
            .await?;

        if shutdown_ctrl.wait_for_drain(self.config.drain_timeout).await {
            info!("All requests drained");
        } else {
            warn!("Drain timeout expired with in-flight requests remaining");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::Request;
    use axum::response::Response;
    use cookie::Cookie;
    use landing_core::FixedClock;
    use tower::ServiceExt;

    use super::*;
    use crate::network::HealthState;
    use crate::session::bootstrap::tests::{
        alice, cookie_header, refresh_ok, valid_token, ScriptedBackend, NOW_MS,
    };

    fn module() -> NetworkModule {
        let backend: Arc<dyn IdentityBackend> = Arc::new(ScriptedBackend::new(refresh_ok));
        let layer = SessionLayer::with_clock(
            Arc::clone(&backend),
            SessionConfig::default(),
            Arc::new(FixedClock::new(NOW_MS)),
        );
        NetworkModule::with_session_layer(
            NetworkConfig {
                host: "127.0.0.1".to_string(),
                ..NetworkConfig::default()
            },
            backend,
            layer,
        )
    }

    async fn send(router: Router, request: Request<Body>) -> (Response, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (Response::from_parts(parts, Body::empty()), json)
    }

    fn session_cookie(response: &Response) -> Cookie<'static> {
        let values: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 1, "exactly one set-cookie expected");
        Cookie::parse_encoded(values[0].to_str().unwrap().to_string()).unwrap()
    }

    #[test]
    fn new_creates_module_without_binding() {
        let module = module();
        assert!(module.listener.is_none());
    }

    #[tokio::test]
    async fn health_responses_carry_session_cookie() {
        let router = module().build_router();
        let (response, json) = send(
            router,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json["state"], "starting");
        assert_eq!(session_cookie(&response).name(), "pb_auth");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn me_reflects_refreshed_cookie() {
        let router = module().build_router();
        let request = Request::builder()
            .uri("/api/me")
            .header(COOKIE, cookie_header(&valid_token(), Some(&alice())))
            .body(Body::empty())
            .unwrap();

        let (response, json) = send(router, request).await;
        assert_eq!(json["user"]["name"], "Alice");
        let payload: serde_json::Value =
            serde_json::from_str(session_cookie(&response).value()).unwrap();
        assert_eq!(payload["record"]["id"], "u1");
    }

    #[tokio::test]
    async fn account_requires_sign_in() {
        let router = module().build_router();
        let (response, json) = send(
            router,
            Request::builder().uri("/api/account").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "authentication required");
        session_cookie(&response);
    }

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let router = module().build_router();
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"identity":"alice@example.com","password":"hunter22"}"#,
            ))
            .unwrap();

        let (response, json) = send(router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json["user"]["id"], "u1");

        let payload: serde_json::Value =
            serde_json::from_str(session_cookie(&response).value()).unwrap();
        assert!(!payload["token"].as_str().unwrap().is_empty());
        assert_eq!(payload["record"]["name"], "Alice");
    }

    #[tokio::test]
    async fn failed_login_still_sets_cookie() {
        let router = module().build_router();
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"identity":"alice@example.com","password":"nope"}"#))
            .unwrap();

        let (response, json) = send(router, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "invalid credentials");
        session_cookie(&response);
    }

    #[tokio::test]
    async fn logout_exports_cleared_session() {
        let router = module().build_router();
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .header(COOKIE, cookie_header(&valid_token(), Some(&alice())))
            .body(Body::empty())
            .unwrap();

        let (response, _) = send(router, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = session_cookie(&response);
        assert_eq!(
            cookie.expires_datetime(),
            Some(time::OffsetDateTime::UNIX_EPOCH)
        );
        let payload: serde_json::Value = serde_json::from_str(cookie.value()).unwrap();
        assert!(payload["record"].is_null());
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = module();
        let port = module.start().await.expect("start should succeed");
        assert!(port > 0, "OS-assigned port should be > 0");
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_stops_on_signal_and_drains() {
        let mut module = module();
        module.start().await.unwrap();
        let controller = module.shutdown_controller();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(module.serve(async {
            let _ = rx.await;
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.health_state(), HealthState::Ready);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let _ = module().serve(std::future::pending::<()>()).await;
    }
}
