//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback so the server can be configured
//! the same way in a shell and in a container.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use landing_core::{CookieOptions, DEFAULT_COOKIE_NAME};

use crate::backend::BackendConfig;
use crate::network::NetworkConfig;
use crate::session::SessionConfig;
use crate::telemetry::LogFormat;

/// Landing site server with cookie-synchronised identity sessions.
#[derive(Debug, Clone, Parser)]
#[command(name = "landing-server", version, about)]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "LANDING_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on (0 picks a free port).
    #[arg(long, env = "LANDING_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Base URL of the identity service.
    #[arg(long, env = "POCKETBASE_URL")]
    pub pocketbase_url: String,

    /// Auth collection holding user records.
    #[arg(long, env = "LANDING_AUTH_COLLECTION", default_value = "users")]
    pub auth_collection: String,

    /// Name of the session cookie.
    #[arg(long, env = "LANDING_COOKIE_NAME", default_value = DEFAULT_COOKIE_NAME)]
    pub cookie_name: String,

    /// Omit the `Secure` cookie attribute (plain-HTTP local development).
    #[arg(long, env = "LANDING_INSECURE_COOKIES")]
    pub insecure_cookies: bool,

    /// Transport timeout for identity service calls, in seconds.
    #[arg(long, env = "LANDING_BACKEND_TIMEOUT_SECS", default_value_t = 10)]
    pub backend_timeout_secs: u64,

    /// Per-request handler timeout, in seconds.
    #[arg(long, env = "LANDING_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Allowed CORS origin; repeat or comma-separate for several.
    #[arg(
        long = "cors-origin",
        env = "LANDING_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    /// Log output format.
    #[arg(long, env = "LANDING_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "LANDING_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..NetworkConfig::default()
        }
    }

    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            cookie_name: self.cookie_name.clone(),
            cookie_options: CookieOptions {
                secure: !self.insecure_cookies,
                ..CookieOptions::default()
            },
        }
    }

    #[must_use]
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.pocketbase_url.clone(),
            collection: self.auth_collection.clone(),
            timeout: Duration::from_secs(self.backend_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["landing-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_with_required_url() {
        let cli = parse(&["--pocketbase-url", "http://pb.local:8090"]);
        assert_eq!(cli.port, 3000);
        assert_eq!(cli.cookie_name, "pb_auth");
        assert_eq!(cli.cors_origins, vec!["*"]);
        assert_eq!(cli.log_format, LogFormat::Pretty);
        assert!(cli.metrics_addr.is_none());

        let session = cli.session_config();
        assert!(session.cookie_options.secure);

        let backend = cli.backend_config();
        assert_eq!(backend.base_url, "http://pb.local:8090");
        assert_eq!(backend.collection, "users");
        assert_eq!(backend.timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides_flow_into_configs() {
        let cli = parse(&[
            "--pocketbase-url",
            "http://pb.local",
            "--port",
            "8080",
            "--insecure-cookies",
            "--cookie-name",
            "sid",
            "--cors-origin",
            "http://localhost:5173,https://example.com",
            "--request-timeout-secs",
            "5",
            "--log-format",
            "json",
        ]);

        let network = cli.network_config();
        assert_eq!(network.port, 8080);
        assert_eq!(network.cors_origins.len(), 2);
        assert_eq!(network.request_timeout, Duration::from_secs(5));

        let session = cli.session_config();
        assert_eq!(session.cookie_name, "sid");
        assert!(!session.cookie_options.secure);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn missing_url_is_an_error() {
        // Guard against the variable leaking in from the test environment.
        if std::env::var_os("POCKETBASE_URL").is_none() {
            assert!(Cli::try_parse_from(["landing-server"]).is_err());
        }
    }
}
