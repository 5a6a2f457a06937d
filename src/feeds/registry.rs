//! Feed types and created feeds
//!
//! Concrete sources (cameras, graphics) are built by factories registered
//! under a type name. The registry only knows that a feed has an engine id
//! and can be told to play.

use std::collections::HashMap;

use crate::config::FeedsConfig;
use crate::error::FeedError;

/// An addressable video source
pub trait Feed: Send {
    /// Identifier the engine knows this feed by, e.g. `feed3`
    fn engine_id(&self) -> &str;

    /// Start producing frames
    fn play(&mut self) -> Result<(), FeedError>;
}

/// Everything a factory needs to build a feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSpec {
    pub index: usize,
    pub engine_id: String,
    pub args: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub framerate: String,
}

type FeedFactory = Box<dyn Fn(&FeedSpec) -> Result<Box<dyn Feed>, FeedError> + Send + Sync>;

struct FeedType {
    factory: FeedFactory,
    play_after_create: bool,
}

/// Registered feed types and the feeds created from them
pub struct FeedRegistry {
    types: HashMap<String, FeedType>,
    feeds: Vec<Option<Box<dyn Feed>>>,
    config: FeedsConfig,
}

impl FeedRegistry {
    pub fn new(config: FeedsConfig) -> Self {
        let feeds = (0..config.capacity).map(|_| None).collect();
        Self {
            types: HashMap::new(),
            feeds,
            config,
        }
    }

    /// Register a factory; a later registration under the same name replaces it
    pub fn register_feed_type<F>(&mut self, name: impl Into<String>, play_after_create: bool, factory: F)
    where
        F: Fn(&FeedSpec) -> Result<Box<dyn Feed>, FeedError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!("Registered feed type {}", name);
        self.types.insert(
            name,
            FeedType {
                factory: Box::new(factory),
                play_after_create,
            },
        );
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Build a feed of `feed_type` in slot `index` (engine id `feed<index + 1>`)
    pub fn create_feed(
        &mut self,
        index: usize,
        feed_type: &str,
        args: Vec<String>,
    ) -> Result<&dyn Feed, FeedError> {
        let capacity = self.feeds.len();
        if index >= capacity {
            return Err(FeedError::IndexOutOfRange { index, capacity });
        }

        let kind = self
            .types
            .get(feed_type)
            .ok_or_else(|| FeedError::UnknownType(feed_type.to_string()))?;

        let spec = FeedSpec {
            index,
            engine_id: format!("feed{}", index + 1),
            args,
            width: self.config.width,
            height: self.config.height,
            framerate: self.config.framerate.clone(),
        };

        let mut feed = (kind.factory)(&spec)?;
        if kind.play_after_create {
            feed.play()?;
        }

        tracing::info!("Created {} feed {} in slot {}", feed_type, feed.engine_id(), index);

        let feed = self.feeds[index].insert(feed);
        Ok(&**feed)
    }

    pub fn get(&self, index: usize) -> Option<&dyn Feed> {
        self.feeds.get(index).and_then(|slot| slot.as_deref())
    }

    pub fn capacity(&self) -> usize {
        self.feeds.len()
    }

    /// Number of filled slots
    pub fn len(&self) -> usize {
        self.feeds.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
