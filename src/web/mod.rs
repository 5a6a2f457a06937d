//! HTTP control endpoint and WebSocket event stream

pub mod handlers;
pub mod server;
pub mod websocket;

pub use server::{AppState, WebServer};
