//! Cookie-synchronised identity sessions.
//!
//! Request flow through [`SessionLayer`]:
//!
//! 1. **Bootstrap** (`bootstrap`): cookie -> `Session`, refreshed or cleared
//! 2. **Context** (`context`): `RequestContext` with the live `SessionHandle`
//!    and a frozen `IdentitySnapshot`, extracted by handlers
//! 3. **Export** (`export`): the session, as it stands after the handler,
//!    written back as one `Set-Cookie` header

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod export;
pub mod handle;
pub mod layer;

pub use bootstrap::{BootstrapOutcome, SessionBootstrapper};
pub use config::SessionConfig;
pub use context::{AuthenticatedUser, RequestContext};
pub use export::SessionExporter;
pub use handle::{CurrentUser, SessionHandle};
pub use layer::{SessionLayer, SessionService};
