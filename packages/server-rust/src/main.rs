use std::sync::Arc;

use clap::Parser;
use landing_server::config::Cli;
use landing_server::network::NetworkModule;
use landing_server::telemetry::{init_tracing, install_metrics_exporter};
use landing_server::PocketBaseClient;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let backend = Arc::new(PocketBaseClient::new(&cli.backend_config())?);
    info!(
        url = %cli.pocketbase_url,
        collection = %cli.auth_collection,
        "identity service configured"
    );

    let mut module = NetworkModule::new(cli.network_config(), cli.session_config(), backend);
    let port = module.start().await?;
    info!(port, "landing server started");

    module.serve(shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
