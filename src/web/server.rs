//! Web server wiring

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::{handlers, websocket};
use crate::config::ControlConfig;
use crate::control::{ControlHandle, Publisher, Shutdown};
use crate::error::{Error, Result};

/// Shared handler state
pub struct AppState {
    pub control: ControlHandle,
    pub publisher: Publisher,
}

/// Serves `POST /control` and `GET /events`
pub struct WebServer {
    config: ControlConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: ControlConfig, control: ControlHandle, publisher: Publisher) -> Self {
        Self {
            config,
            state: Arc::new(AppState { control, publisher }),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.config.bind_address, self.config.http_port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address: {}", e)))
    }

    /// Serve until `shutdown` fires
    pub async fn run(self, shutdown: Shutdown) -> Result<()> {
        let addr = self.bind_addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Control API listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("Control API stopped");
        Ok(())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/control", post(handlers::control))
        .route("/events", get(websocket::events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
