//! Signing Service entrypoint: parses configuration, validates it, and
//! serves the router built by `signing_service::build_router`.

use anyhow::Result;
use clap::Parser;
use signing_service::config::Config;
use signing_service::{build_router, AppState};
use std::sync::Arc;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let config = Config::parse();
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid configuration");
        std::process::exit(1);
    }

    info!(
        listen_addr = %config.listen_addr,
        mpc_nodes = config.mpc_nodes,
        mpc_threshold = config.mpc_threshold,
        share_store_path = ?config.share_store_path,
        "Starting signing service"
    );

    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(address = %listen_addr, "Listening");

    axum::serve(listener, app).await?;

    Ok(())
}
