//! Quill server binary — wires config, the orchestrator, and the HTTP
//! surface together and serves until ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quill_server::config::QuillConfig;
use quill_server::echo::EchoProvider;
use quill_server::routes::{AppState, router};
use quill_session::{SessionOrchestrator, SessionStore};

/// Quill document-agent server.
#[derive(Parser, Debug)]
#[command(name = "quill-server", about = "Quill document-agent server")]
struct Cli {
    /// Host to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config; 0 auto-assigns).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a JSON config file (default `quill.json`).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let mut config =
        QuillConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = Arc::new(SessionStore::new(config.session));
    let orchestrator = Arc::new(SessionOrchestrator::new(store, Arc::new(EchoProvider)));
    let app = router(AppState::new(orchestrator));

    let listener = TcpListener::bind(config.server.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr()))?;
    let addr = listener.local_addr().context("failed to read bind addr")?;
    info!(%addr, "quill server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_leave_config_alone() {
        let cli = Cli::parse_from(["quill-server"]);
        assert_eq!(cli.host, None);
        assert_eq!(cli.port, None);
        assert_eq!(cli.config, None);
    }

    #[test]
    fn cli_custom_flags() {
        let cli = Cli::parse_from([
            "quill-server",
            "--host",
            "0.0.0.0",
            "--port",
            "9400",
            "--config",
            "/tmp/quill.json",
        ]);
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(9400));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/quill.json")));
    }
}
