//! # Switcher Control
//!
//! Control plane for a live video-switching rig.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────────┐
//! │  Director (HTTP)     │        │  Observers (WebSocket)       │
//! │  POST /control       │        │  GET /events   topic "main"  │
//! └──────────┬───────────┘        └──────────────▲───────────────┘
//!            │ Request + reply slot              │ Envelope
//!            ▼                                   │
//! ┌─────────────────────────────────────────────┴────────────────┐
//! │                 Controller (control::controller)              │
//! │   one request at a time, cut waits run inside the loop        │
//! │  ┌───────────────────────┐     ┌─────────────────────────┐    │
//! │  │ Switcher (buses/DSKs) │ ──▶ │ Ramp (switcher::ramp)   │    │
//! │  └───────────┬───────────┘     └─────────────────────────┘    │
//! │              │ Effects { commands, notifications }            │
//! │              ▼                                                │
//! │  ┌───────────────────────┐     ┌─────────────────────────┐    │
//! │  │ DownstreamClient      │     │ Publisher (broadcast)   │    │
//! │  └───────────┬───────────┘     └─────────────────────────┘    │
//! └──────────────┼────────────────────────────────────────────────┘
//!                │ line protocol over TCP
//!                ▼
//!        ┌───────────────┐
//!        │ Mixing engine │
//!        └───────────────┘
//! ```

pub mod config;
pub mod control;
pub mod downstream;
pub mod error;
pub mod feeds;
pub mod protocol;
pub mod switcher;
pub mod web;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default frame rate used to size ramps
    pub const DEFAULT_FRAMERATE: f64 = 30.0;

    /// Feed shown on the preview bus at startup
    pub const DEFAULT_PREVIEW: u32 = 1;

    /// Feed shown on the program bus at startup
    pub const DEFAULT_PROGRAM: u32 = 2;

    /// Number of feeds advertised to observers on sync
    pub const DEFAULT_FEEDS_COUNT: u32 = 8;

    /// Slots in the feed registry
    pub const DEFAULT_FEED_CAPACITY: usize = 12;

    /// Engine feed ids reserved for downstream keyers
    pub const DEFAULT_DSK_FEED_IDS: [u32; 4] = [9, 10, 11, 12];

    /// Default duration of a cut transition in seconds
    pub const DEFAULT_CUT_DURATION_SECS: f64 = 0.25;

    /// Longest accepted fade or cut, in seconds
    pub const MAX_TRANSITION_SECS: f64 = 3600.0;

    /// Default mixing engine address
    pub const DEFAULT_ENGINE_ADDRESS: &str = "127.0.0.1:9999";

    /// Default HTTP port for the control and event endpoints
    pub const DEFAULT_HTTP_PORT: u16 = 5555;

    /// Topic every notification is published under
    pub const NOTIFICATION_TOPIC: &str = "main";

    /// Terminators closing a solicited engine reply
    pub const REPLY_TERMINATORS: [&str; 2] = ["STAT: \n", "MSG: \n"];

    /// Read chunk size for engine replies
    pub const READ_CHUNK_SIZE: usize = 4096;
}
