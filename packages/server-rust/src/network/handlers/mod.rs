//! HTTP handler definitions for the landing server.
//!
//! Defines `AppState` (shared state carried through axum extractors) and
//! re-exports all handler functions for building the router.

pub mod account;
pub mod health;

pub use account::{account_handler, login_handler, logout_handler, me_handler};
pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use crate::backend::IdentityBackend;

use super::ShutdownController;

/// Shared application state passed to handlers via `State` extraction.
///
/// Holds `Arc`s so cloning per request is cheap. Per-user state never lives
/// here; it travels in the request's `RequestContext`.
#[derive(Clone)]
pub struct AppState {
    /// Health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Identity service used for password login.
    pub backend: Arc<dyn IdentityBackend>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
