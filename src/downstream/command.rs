//! Engine command lines

use std::fmt;

/// One line of the engine's text protocol
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `vfeed alpha <feed> <0|1>`
    SetAlpha { feed_id: u32, visible: bool },
    /// `vfeed move alpha <feed> <delta> <frames>`
    MoveAlpha { feed_id: u32, delta: f64, frames: u32 },
    /// `tcl eval SetFeedToOverlay <program> <preview> <keyer feeds...>`
    SetFeedToOverlay {
        program: u32,
        preview: u32,
        keyer_feed_ids: Vec<u32>,
    },
    /// `feed list`
    FeedList,
}

impl Command {
    /// Whether the engine answers this command with a framed reply
    pub fn expects_response(&self) -> bool {
        matches!(self, Command::FeedList)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetAlpha { feed_id, visible } => {
                write!(f, "vfeed alpha {} {}", feed_id, u8::from(*visible))
            }
            Command::MoveAlpha {
                feed_id,
                delta,
                frames,
            } => write!(f, "vfeed move alpha {} {} {}", feed_id, delta, frames),
            Command::SetFeedToOverlay {
                program,
                preview,
                keyer_feed_ids,
            } => {
                let keyers = keyer_feed_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "tcl eval SetFeedToOverlay {} {} {}", program, preview, keyers)
            }
            Command::FeedList => f.write_str("feed list"),
        }
    }
}
