//! Standalone test server: `wsmcp-test-server --addr 127.0.0.1:3000`.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wsmcp_test_server::TestServer;

#[derive(Parser, Debug)]
#[command(name = "wsmcp-test-server", version, about = "WebSocket MCP server for testing clients")]
struct Args {
    /// Address to listen on
    #[arg(long, short = 'a', default_value = "127.0.0.1:3000", env = "WSMCP_TEST_SERVER_ADDR")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let server = TestServer::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    println!("listening on {}", server.url());

    shutdown_signal().await;
    tracing::info!("shutdown signal received");
    server.stop().await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM; waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
