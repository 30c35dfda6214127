use landing_core::{CookieOptions, DEFAULT_COOKIE_NAME};

/// Session cookie configuration shared by the bootstrapper and exporter.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session.
    pub cookie_name: String,
    /// Attributes applied to the exported cookie.
    pub cookie_options: CookieOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_options: CookieOptions::default(),
        }
    }
}
