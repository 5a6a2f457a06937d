//! Mixing engine line protocol

pub mod client;
pub mod command;
pub mod framing;

pub use client::DownstreamClient;
pub use command::Command;
pub use framing::{parse_feed_ids, FrameReader};
