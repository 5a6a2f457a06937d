//! Switcher state machine and transition engine

pub mod model;
pub mod ramp;

pub use model::{CutPlan, Dsk, Effects, Switcher};
pub use ramp::{fade_command, Fade, Ramp};
