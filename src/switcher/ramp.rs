//! Alpha ramps
//!
//! Converts a fade duration into the frame count and per-frame delta the
//! engine's `vfeed move alpha` command expects.

use crate::constants::MAX_TRANSITION_SECS;
use crate::downstream::Command;
use crate::error::SwitcherError;

/// Fade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fade {
    In,
    Out,
}

impl Fade {
    /// Whether the feed ends up visible
    pub fn visible(self) -> bool {
        matches!(self, Fade::In)
    }
}

/// A frame-stepped opacity ramp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    pub frames: u32,
    /// Opacity change per frame, negative when fading out
    pub delta: f64,
}

impl Ramp {
    /// Ramp covering `duration` seconds at `framerate`.
    ///
    /// `None` for a zero duration: the change is instantaneous. Durations
    /// that are negative, not finite, above [`MAX_TRANSITION_SECS`] or that
    /// need more frames than the engine can count are rejected.
    pub fn for_duration(
        duration: f64,
        framerate: f64,
        fade: Fade,
    ) -> Result<Option<Self>, SwitcherError> {
        if !(duration >= 0.0 && duration <= MAX_TRANSITION_SECS) {
            return Err(SwitcherError::DurationOutOfRange(duration));
        }
        if duration == 0.0 {
            return Ok(None);
        }

        let frames = (duration * framerate).ceil().max(1.0);
        if !(frames.is_finite() && frames <= u32::MAX as f64) {
            return Err(SwitcherError::DurationOutOfRange(duration));
        }
        let frames = frames as u32;
        let step = 1.0 / frames as f64;

        Ok(Some(Self {
            frames,
            delta: match fade {
                Fade::In => step,
                Fade::Out => -step,
            },
        }))
    }

    pub fn command(&self, feed_id: u32) -> Command {
        Command::MoveAlpha {
            feed_id,
            delta: self.delta,
            frames: self.frames,
        }
    }
}

/// The single command that fades `feed_id` in or out over `duration`
pub fn fade_command(
    feed_id: u32,
    duration: f64,
    framerate: f64,
    fade: Fade,
) -> Result<Command, SwitcherError> {
    Ok(match Ramp::for_duration(duration, framerate, fade)? {
        Some(ramp) => ramp.command(feed_id),
        None => Command::SetAlpha {
            feed_id,
            visible: fade.visible(),
        },
    })
}
