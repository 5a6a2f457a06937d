//! Error types for the switcher control plane

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Downstream error: {0}")]
    Downstream(#[from] DownstreamError),

    #[error("Switcher error: {0}")]
    Switcher(#[from] SwitcherError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors talking to the mixing engine
#[derive(Error, Debug)]
pub enum DownstreamError {
    #[error("Connection to {address} failed: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Not connected to the mixing engine")]
    NotConnected,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Timed out waiting for a framed reply")]
    Timeout,
}

/// Bus and keyer model errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwitcherError {
    #[error("DSK {dsk_id} out of range (have {count})")]
    DskOutOfRange { dsk_id: usize, count: usize },

    #[error("Transition duration {0}s is not between 0 and {}s", crate::constants::MAX_TRANSITION_SECS)]
    DurationOutOfRange(f64),
}

/// Control channel errors
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Control loop is not running")]
    LoopClosed,
}

/// Feed registry errors
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Unknown feed type: {0}")]
    UnknownType(String),

    #[error("Feed index {index} exceeds capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },

    #[error("Failed to create feed: {0}")]
    CreateFailed(String),

    #[error("Failed to play feed {id}: {reason}")]
    PlayFailed { id: String, reason: String },
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
