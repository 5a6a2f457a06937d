//! Bus and keyer model
//!
//! Holds preview/program assignments and the downstream keyers. Every
//! operation mutates the model and returns the [`Effects`] it implies: engine
//! commands in send order and notifications in publish order. Performing
//! them is the controller's job.

use std::time::Duration;

use super::ramp::{fade_command, Fade, Ramp};
use crate::config::SwitcherConfig;
use crate::downstream::Command;
use crate::error::SwitcherError;
use crate::protocol::Notification;

/// A downstream keyer
#[derive(Debug, Clone, PartialEq)]
pub struct Dsk {
    pub id: usize,
    pub feed_id: u32,
    pub active: bool,
    pub transition_duration: f64,
}

impl Dsk {
    pub fn new(id: usize, feed_id: u32, transition_duration: f64) -> Self {
        Self {
            id,
            feed_id,
            active: false,
            transition_duration,
        }
    }
}

/// Commands and notifications produced by one model operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub commands: Vec<Command>,
    pub notifications: Vec<Notification>,
}

impl Effects {
    pub fn command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn extend(&mut self, other: Effects) {
        self.commands.extend(other.commands);
        self.notifications.extend(other.notifications);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.notifications.is_empty()
    }
}

/// First half of a cut transition: ramp the preview feed, then wait
#[derive(Debug, Clone, PartialEq)]
pub struct CutPlan {
    /// Absent for a zero-length cut
    pub ramp: Option<Command>,
    pub wait: Duration,
}

/// Preview/program buses plus keyers
#[derive(Debug, Clone)]
pub struct Switcher {
    preview: u32,
    program: u32,
    feeds_count: u32,
    framerate: f64,
    dsks: Vec<Dsk>,
}

impl Switcher {
    pub fn new(config: &SwitcherConfig) -> Self {
        let dsks = config
            .dsks
            .iter()
            .enumerate()
            .map(|(id, dsk)| Dsk::new(id, dsk.feed_id, dsk.transition_duration))
            .collect();

        Self {
            preview: config.preview,
            program: config.program,
            feeds_count: config.feeds_count,
            framerate: config.framerate,
            dsks,
        }
    }

    pub fn preview(&self) -> u32 {
        self.preview
    }

    pub fn program(&self) -> u32 {
        self.program
    }

    pub fn feeds_count(&self) -> u32 {
        self.feeds_count
    }

    pub fn framerate(&self) -> f64 {
        self.framerate
    }

    pub fn dsks(&self) -> &[Dsk] {
        &self.dsks
    }

    pub fn dsk(&self, dsk_id: usize) -> Result<&Dsk, SwitcherError> {
        self.dsks.get(dsk_id).ok_or(SwitcherError::DskOutOfRange {
            dsk_id,
            count: self.dsks.len(),
        })
    }

    /// Ids of the keyers currently on air, in keyer order
    pub fn active_dsk_ids(&self) -> Vec<usize> {
        self.dsks
            .iter()
            .filter(|dsk| dsk.active)
            .map(|dsk| dsk.id)
            .collect()
    }

    /// Engine feed ids of every keyer, in keyer order
    pub fn keyer_feed_ids(&self) -> Vec<u32> {
        self.dsks.iter().map(|dsk| dsk.feed_id).collect()
    }

    /// Known visual state at startup: every keyer hidden, buses applied
    pub fn startup(&mut self) -> Effects {
        let mut effects = self.hide_all_dsks();
        effects.extend(self.update_main_bus());
        effects
    }

    pub fn set_preview(&mut self, feed: u32) -> Effects {
        self.preview = feed;
        self.update_main_bus()
    }

    pub fn set_program(&mut self, feed: u32) -> Effects {
        self.program = feed;
        self.update_main_bus()
    }

    /// Swap preview and program
    pub fn take(&mut self) -> Effects {
        std::mem::swap(&mut self.preview, &mut self.program);
        self.update_main_bus()
    }

    fn update_main_bus(&self) -> Effects {
        let mut effects = Effects::default();
        effects.command(Command::SetAlpha {
            feed_id: self.preview,
            visible: false,
        });
        effects.command(Command::SetAlpha {
            feed_id: self.program,
            visible: true,
        });
        effects.command(Command::SetFeedToOverlay {
            program: self.program,
            preview: self.preview,
            keyer_feed_ids: self.keyer_feed_ids(),
        });
        effects.notify(Notification::Preview(self.preview));
        effects.notify(Notification::Program(self.program));
        effects
    }

    /// Fade a keyer in when it is off air, out when it is on air
    pub fn toggle_dsk(&mut self, dsk_id: usize) -> Result<Effects, SwitcherError> {
        if self.dsk(dsk_id)?.active {
            self.transition_out(dsk_id)
        } else {
            self.transition_in(dsk_id)
        }
    }

    pub fn transition_in(&mut self, dsk_id: usize) -> Result<Effects, SwitcherError> {
        self.fade_dsk(dsk_id, Fade::In)
    }

    pub fn transition_out(&mut self, dsk_id: usize) -> Result<Effects, SwitcherError> {
        self.fade_dsk(dsk_id, Fade::Out)
    }

    fn fade_dsk(&mut self, dsk_id: usize, fade: Fade) -> Result<Effects, SwitcherError> {
        let framerate = self.framerate;
        let count = self.dsks.len();
        let dsk = self
            .dsks
            .get_mut(dsk_id)
            .ok_or(SwitcherError::DskOutOfRange { dsk_id, count })?;

        let command = fade_command(dsk.feed_id, dsk.transition_duration, framerate, fade)?;
        dsk.active = fade.visible();

        let mut effects = Effects::default();
        effects.command(command);
        effects.notify(Notification::ActiveDsks(self.active_dsk_ids()));
        Ok(effects)
    }

    /// Hide every keyer instantly, ignoring configured durations
    pub fn hide_all_dsks(&mut self) -> Effects {
        let mut effects = Effects::default();
        for dsk in &mut self.dsks {
            effects.command(Command::SetAlpha {
                feed_id: dsk.feed_id,
                visible: false,
            });
            dsk.active = false;
        }
        effects
    }

    /// Full state for an observer that joined late
    pub fn sync(&self) -> Effects {
        let mut effects = Effects::default();
        effects.notify(Notification::Preview(self.preview));
        effects.notify(Notification::Program(self.program));
        effects.notify(Notification::FeedsCount(self.feeds_count));
        effects.notify(Notification::ActiveDsks(self.active_dsk_ids()));
        effects
    }

    /// Ramp for the preview feed of a cut lasting `duration` seconds.
    ///
    /// The caller waits out `wait` and then calls [`Switcher::take`].
    pub fn plan_cut(&self, duration: f64) -> Result<CutPlan, SwitcherError> {
        let ramp = Ramp::for_duration(duration, self.framerate, Fade::In)?
            .map(|ramp| ramp.command(self.preview));
        let wait = Duration::try_from_secs_f64(duration)
            .map_err(|_| SwitcherError::DurationOutOfRange(duration))?;

        Ok(CutPlan { ramp, wait })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DskConfig;
    use proptest::prelude::*;

    fn switcher() -> Switcher {
        Switcher::new(&SwitcherConfig::default())
    }

    fn switcher_with_durations(durations: &[f64]) -> Switcher {
        let config = SwitcherConfig {
            dsks: durations
                .iter()
                .enumerate()
                .map(|(i, &transition_duration)| DskConfig {
                    feed_id: 9 + i as u32,
                    transition_duration,
                })
                .collect(),
            ..SwitcherConfig::default()
        };
        Switcher::new(&config)
    }

    fn active_dsk_notifications(effects: &Effects) -> Vec<&Vec<usize>> {
        effects
            .notifications
            .iter()
            .filter_map(|n| match n {
                Notification::ActiveDsks(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_bus_update_commands() {
        let mut switcher = switcher();
        let effects = switcher.set_program(5);

        assert_eq!(
            effects.commands,
            vec![
                Command::SetAlpha { feed_id: 1, visible: false },
                Command::SetAlpha { feed_id: 5, visible: true },
                Command::SetFeedToOverlay {
                    program: 5,
                    preview: 1,
                    keyer_feed_ids: vec![9, 10, 11, 12],
                },
            ]
        );
        assert_eq!(
            effects.notifications,
            vec![Notification::Preview(1), Notification::Program(5)]
        );
    }

    #[test]
    fn test_unchanged_assignment_still_notifies() {
        let mut switcher = switcher();
        let effects = switcher.set_preview(1);
        assert_eq!(effects.commands.len(), 3);
        assert_eq!(
            effects.notifications,
            vec![Notification::Preview(1), Notification::Program(2)]
        );
    }

    #[test]
    fn test_take_swaps_before_commands() {
        let mut switcher = switcher();
        let effects = switcher.take();
        assert_eq!(switcher.preview(), 2);
        assert_eq!(switcher.program(), 1);
        assert_eq!(
            effects.commands[0],
            Command::SetAlpha { feed_id: 2, visible: false }
        );
        assert_eq!(
            effects.commands[1],
            Command::SetAlpha { feed_id: 1, visible: true }
        );
    }

    #[test]
    fn test_toggle_with_ramp() {
        let mut switcher = switcher_with_durations(&[0.5, 0.0]);
        let effects = switcher.toggle_dsk(0).unwrap();

        assert_eq!(effects.commands.len(), 1);
        match &effects.commands[0] {
            Command::MoveAlpha { feed_id, delta, frames } => {
                assert_eq!(*feed_id, 9);
                assert_eq!(*frames, 15);
                assert!((delta - 0.0667).abs() < 1e-3);
            }
            other => panic!("expected a ramp, got {:?}", other),
        }
        assert!(switcher.dsk(0).unwrap().active);
        assert_eq!(effects.notifications, vec![Notification::ActiveDsks(vec![0])]);

        let effects = switcher.toggle_dsk(0).unwrap();
        match &effects.commands[0] {
            Command::MoveAlpha { delta, frames, .. } => {
                assert_eq!(*frames, 15);
                assert!(*delta < 0.0);
            }
            other => panic!("expected a ramp, got {:?}", other),
        }
        assert!(!switcher.dsk(0).unwrap().active);
    }

    #[test]
    fn test_toggle_without_duration_is_instant() {
        let mut switcher = switcher_with_durations(&[0.5, 0.0]);
        let effects = switcher.toggle_dsk(1).unwrap();
        assert_eq!(
            effects.commands,
            vec![Command::SetAlpha { feed_id: 10, visible: true }]
        );
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut switcher = switcher();
        assert_eq!(
            switcher.toggle_dsk(5),
            Err(SwitcherError::DskOutOfRange { dsk_id: 5, count: 4 })
        );
        assert!(switcher.active_dsk_ids().is_empty());
    }

    #[test]
    fn test_hide_all_then_sync() {
        let mut switcher = switcher();
        switcher.toggle_dsk(1).unwrap();
        switcher.toggle_dsk(3).unwrap();

        let hidden = switcher.hide_all_dsks();
        assert_eq!(
            hidden.commands,
            vec![9, 10, 11, 12]
                .into_iter()
                .map(|feed_id| Command::SetAlpha { feed_id, visible: false })
                .collect::<Vec<_>>()
        );
        assert!(hidden.notifications.is_empty());

        assert_eq!(
            switcher.sync().notifications,
            vec![
                Notification::Preview(1),
                Notification::Program(2),
                Notification::FeedsCount(8),
                Notification::ActiveDsks(vec![]),
            ]
        );
    }

    #[test]
    fn test_startup_hides_then_applies_buses() {
        let mut switcher = switcher();
        let effects = switcher.startup();
        assert_eq!(effects.commands.len(), 4 + 3);
        assert!(matches!(
            effects.commands.last(),
            Some(Command::SetFeedToOverlay { .. })
        ));
    }

    #[test]
    fn test_plan_cut() {
        let switcher = switcher();
        let plan = switcher.plan_cut(0.25).unwrap();
        assert_eq!(plan.wait, Duration::from_millis(250));
        match plan.ramp {
            Some(Command::MoveAlpha { feed_id, frames, .. }) => {
                assert_eq!(feed_id, 1);
                assert_eq!(frames, 8);
            }
            other => panic!("expected a ramp, got {:?}", other),
        }

        let instant = switcher.plan_cut(0.0).unwrap();
        assert!(instant.ramp.is_none());
        assert_eq!(instant.wait, Duration::ZERO);
    }

    #[test]
    fn test_plan_cut_rejects_unbounded_durations() {
        let switcher = switcher();
        for duration in [1e20, f64::MAX, f64::INFINITY, -1.0] {
            assert_eq!(
                switcher.plan_cut(duration).unwrap_err(),
                SwitcherError::DurationOutOfRange(duration)
            );
        }
        assert!(switcher.plan_cut(f64::NAN).is_err());
    }

    #[test]
    fn test_keyer_with_unbounded_duration_stays_hidden() {
        let mut switcher = switcher_with_durations(&[1e9]);
        assert!(matches!(
            switcher.toggle_dsk(0),
            Err(SwitcherError::DurationOutOfRange(_))
        ));
        assert!(switcher.active_dsk_ids().is_empty());
    }

    proptest! {
        #[test]
        fn prop_take_swaps_buses(a in 1u32..64, b in 1u32..64) {
            let mut switcher = switcher();
            switcher.set_program(a);
            switcher.set_preview(b);
            switcher.take();
            prop_assert_eq!(switcher.program(), b);
            prop_assert_eq!(switcher.preview(), a);
        }

        #[test]
        fn prop_double_toggle_restores(dsk_id in 0usize..4, others in proptest::collection::vec(any::<bool>(), 4)) {
            let mut switcher = switcher_with_durations(&[0.0, 0.2, 0.5, 1.0]);
            for (id, on) in others.iter().enumerate() {
                if *on && id != dsk_id {
                    switcher.toggle_dsk(id).unwrap();
                }
            }
            let before = switcher.dsk(dsk_id).unwrap().active;

            for _ in 0..2 {
                let effects = switcher.toggle_dsk(dsk_id).unwrap();
                let notified = active_dsk_notifications(&effects);
                prop_assert_eq!(notified.len(), 1);
                prop_assert_eq!(notified[0], &switcher.active_dsk_ids());
            }

            prop_assert_eq!(switcher.dsk(dsk_id).unwrap().active, before);
        }
    }
}
