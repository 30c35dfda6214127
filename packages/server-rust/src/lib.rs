//! Landing Server — HTTP server for the landing site with cookie-synchronised identity sessions.

pub mod backend;
pub mod config;
pub mod error;
pub mod network;
pub mod session;
pub mod telemetry;

pub use backend::{IdentityBackend, PocketBaseClient};
pub use error::ApiError;
pub use session::{RequestContext, SessionLayer};
