//! Hook Arena Server
//!
//! Binds the WebSocket listener and runs rooms until ctrl-c.

use std::sync::Arc;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

use hook_arena::{GameServer, ServerConfig, TICK_RATE, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    info!("Hook Arena Server v{}", VERSION);
    info!(
        "Tick Rate: {} Hz (default {}), room capacity {}, max connections {}",
        config.tick_rate, TICK_RATE, config.room_capacity, config.max_connections
    );

    let server = Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => error!("Failed to listen for ctrl-c: {}", e),
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
