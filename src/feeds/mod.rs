//! Feed registry

pub mod registry;

pub use registry::{Feed, FeedRegistry, FeedSpec};
