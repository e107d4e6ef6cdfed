use std::sync::Arc;

use anyhow::Context;
use spillway::config::Config;
use spillway::handler::{EchoModule, ModuleManager, StatusModule};
use spillway::server::Server;
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .context("Usage: spillway <configuration file>")?;
    let cfg = Config::from_file(&path)?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if cfg.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let modules = ModuleManager::new()
        .register("/", Arc::new(StatusModule))
        .register("/echo", Arc::new(EchoModule));

    let server = Server::launch(&cfg, Arc::new(modules)).await?;

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
