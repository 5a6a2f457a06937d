//! Switcher control daemon
//!
//! Connects to the mixing engine, serves the control API and streams
//! notifications until a `quit` request or Ctrl+C.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use switcher_control::{
    config::AppConfig,
    control::{self, Controller, Publisher, Shutdown},
    downstream::DownstreamClient,
    web::WebServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting switcher control");

    // Config path from the first argument, else the per-user file, else defaults
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load_or_default(config_path.as_deref())
        .context("failed to load configuration")?;

    tracing::info!(
        "Engine {} | {} fps | {} DSKs",
        config.downstream.address,
        config.switcher.framerate,
        config.switcher.dsks.len()
    );

    let shutdown = Shutdown::new();
    let publisher = Publisher::new(config.control.event_buffer);
    let (handle, requests) = control::channel(config.control.queue_depth);

    let downstream = DownstreamClient::connect(&config.downstream).await;
    if !downstream.is_connected() {
        tracing::warn!("Running degraded: engine commands will fail until restart");
    }

    let controller = Controller::new(&config, downstream, publisher.clone(), shutdown.clone());
    let control_task = tokio::spawn(controller.run(requests));

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            ctrl_c.trigger();
        }
    });

    let server = WebServer::new(config.control.clone(), handle, publisher);
    if let Err(e) = server.run(shutdown.clone()).await {
        tracing::error!("Control API failed: {}", e);
        shutdown.trigger();
    }

    control_task.await.context("control loop panicked")?;
    tracing::info!("Switcher control stopped");
    Ok(())
}
