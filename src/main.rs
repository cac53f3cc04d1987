//! HubSpace Bridge - Binary Entry Point
//!
//! `serve` runs the HTTP command proxy, `analyze` writes the metadevice data
//! reference.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use hubspace_bridge::analysis::{self, AnalyzeOptions};
use hubspace_bridge::config::{self, ServerConfig};
use hubspace_bridge::{create_router, AppState};

/// HubSpace Bridge - smart-home command proxy and telemetry analyzer.
#[derive(Parser, Debug)]
#[command(name = "hubspace-bridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP command proxy.
    Serve {
        /// Host to bind to [env: HUBSPACE_BRIDGE_HOST].
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to [env: HUBSPACE_BRIDGE_PORT].
        #[arg(short, long)]
        port: Option<u16>,
        /// Serve a captured metadevice listing instead of the cloud
        /// [env: HUBSPACE_SNAPSHOT_PATH].
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Summarize a metadevice capture into a Markdown reference.
    Analyze {
        /// Metadevice JSON array.
        #[arg(long, default_value = "research/05_metadevices_with_state.json")]
        input: PathBuf,
        /// Pipe-delimited compact listing, loaded for validation.
        #[arg(long, default_value = "research/05b_metadevices_compact.txt")]
        compact: PathBuf,
        /// Output Markdown path.
        #[arg(long, default_value = "docs/hubspace_data_reference.md")]
        out: PathBuf,
        /// JSON capability table replacing the built-in Hubitat mapping.
        #[arg(long)]
        capabilities: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    match args.command {
        Command::Serve {
            host,
            port,
            snapshot,
        } => {
            let mut server = ServerConfig::from_env();
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }
            if snapshot.is_some() {
                server.snapshot = snapshot;
            }
            run_server(server).await
        }
        Command::Analyze {
            input,
            compact,
            out,
            capabilities,
        } => {
            let options = AnalyzeOptions {
                input,
                compact: Some(compact),
                out,
                capabilities,
            };
            // blocking file work stays off the runtime workers
            let summary = tokio::task::spawn_blocking(move || analysis::run(&options))
                .await
                .context("analyzer task failed")??;
            info!(devices = summary.device_count, "analysis complete");
            Ok(())
        }
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("hubspace_bridge=info,tower_http=info")
    });

    if config::json_logging() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

async fn run_server(server: ServerConfig) -> Result<()> {
    let addr = server
        .address()
        .with_context(|| format!("Invalid address: {}:{}", server.host, server.port))?;
    let backend = server.backend();
    info!(
        %addr,
        backend = %backend.describe(),
        version = hubspace_bridge::VERSION,
        "starting bridge"
    );

    let state = Arc::new(AppState::new(backend));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("bridge server failure")?;

    info!("bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
