//! # Mute State Machine
//!
//! Two states, `Idle` and `Muted`. The saved pre-mute volume lives inside the
//! `Muted` variant, so it exists exactly as long as the output is muted and
//! disappears in the same assignment that leaves `Muted`.
//!
//! | State | Classification  | Action                          | Next  |
//! |-------|-----------------|---------------------------------|-------|
//! | Idle  | Advertisement   | save volume, mute, alert tone   | Muted |
//! | Idle  | Content/Unknown | nothing                         | Idle  |
//! | Muted | Advertisement   | nothing                         | Muted |
//! | Muted | Content         | restore saved volume            | Idle  |
//! | Muted | Unknown         | restore saved volume            | Idle  |
//!
//! Deciding what to do ([`plan`]) is pure; [`MuteStateMachine::step`] applies
//! the decision to the collaborators.

use crate::backend::{AlertPlayer, VolumeController};
use crate::error::ControllerError;
use crate::playback::Classification;
use std::fmt;

/// Saved when the current level can be read neither from the controller nor
/// from the snapshot.
pub const FALLBACK_SAVED_VOLUME: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MuteState {
    Idle,
    Muted { saved_volume: f32 },
}

impl MuteState {
    pub fn is_muted(&self) -> bool {
        matches!(self, MuteState::Muted { .. })
    }

    pub fn saved_volume(&self) -> Option<f32> {
        match self {
            MuteState::Muted { saved_volume } => Some(*saved_volume),
            MuteState::Idle => None,
        }
    }
}

/// What a tick should do to the output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Nothing,
    Mute,
    Restore { level: f32 },
}

/// Decide the action for `classification` in `state`.
#[must_use]
pub fn plan(state: &MuteState, classification: Classification) -> Action {
    match (state, classification) {
        (MuteState::Idle, Classification::Advertisement) => Action::Mute,
        (MuteState::Idle, _) => Action::Nothing,
        (MuteState::Muted { .. }, Classification::Advertisement) => Action::Nothing,
        (MuteState::Muted { saved_volume }, _) => Action::Restore {
            level: *saved_volume,
        },
    }
}

/// Why the volume was put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreCause {
    /// Regular content is playing again
    ContentResumed,
    /// Track or player could no longer be identified
    PlayerLost,
    /// The monitor is shutting down
    Shutdown,
}

/// A state change that actually happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Muted { saved_volume: f32 },
    Restored { level: f32, cause: RestoreCause },
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Muted { saved_volume } => {
                write!(f, "muted (saved volume {saved_volume:.2})")
            }
            Transition::Restored { level, cause } => {
                write!(f, "restored volume to {level:.2} ({cause:?})")
            }
        }
    }
}

/// Result of one successfully applied tick.
#[derive(Debug, Default)]
pub struct Step {
    pub transition: Option<Transition>,
    /// Non-fatal problems: unreadable volume, alert tone failure
    pub warnings: Vec<ControllerError>,
}

/// Owns the mute state for the lifetime of a monitor run.
#[derive(Debug)]
pub struct MuteStateMachine {
    state: MuteState,
    alert_enabled: bool,
    alert_volume: f32,
}

impl MuteStateMachine {
    pub fn new(alert_enabled: bool, alert_volume: f32) -> Self {
        Self {
            state: MuteState::Idle,
            alert_enabled,
            alert_volume,
        }
    }

    pub fn state(&self) -> MuteState {
        self.state
    }

    /// Apply `classification` to the output.
    ///
    /// `reported_volume` is the player's own volume reading from the same
    /// tick, used only if the controller cannot report its level.
    ///
    /// A mute or restore failure is returned as `Err`; the state then still
    /// holds the saved volume so [`release`](Self::release) can put it back.
    pub fn step<V, A>(
        &mut self,
        classification: Classification,
        reported_volume: Option<f32>,
        controller: &mut V,
        alert: &mut A,
    ) -> Result<Step, ControllerError>
    where
        V: VolumeController + ?Sized,
        A: AlertPlayer + ?Sized,
    {
        let mut step = Step::default();

        match plan(&self.state, classification) {
            Action::Nothing => {}
            Action::Mute => {
                let saved_volume = match controller.current_level() {
                    Ok(level) => level,
                    Err(e) => {
                        step.warnings.push(e);
                        reported_volume.unwrap_or(FALLBACK_SAVED_VOLUME)
                    }
                };

                self.state = MuteState::Muted { saved_volume };
                controller.mute()?;

                if self.alert_enabled {
                    if let Err(e) = alert.play(self.alert_volume) {
                        step.warnings.push(e);
                    }
                }
                step.transition = Some(Transition::Muted { saved_volume });
            }
            Action::Restore { level } => {
                let cause = if classification == Classification::Content {
                    RestoreCause::ContentResumed
                } else {
                    RestoreCause::PlayerLost
                };
                controller.restore(level)?;
                self.state = MuteState::Idle;
                step.transition = Some(Transition::Restored { level, cause });
            }
        }

        Ok(step)
    }

    /// Put the saved volume back, whatever the classification.
    ///
    /// Used on shutdown, on player loss and after fatal errors. The state is
    /// `Idle` afterwards even if the restore call fails. Returns `None` when
    /// nothing was muted.
    pub fn release<V>(
        &mut self,
        controller: &mut V,
        cause: RestoreCause,
    ) -> Option<Result<Transition, ControllerError>>
    where
        V: VolumeController + ?Sized,
    {
        let MuteState::Muted { saved_volume } = self.state else {
            return None;
        };
        self.state = MuteState::Idle;

        Some(
            controller
                .restore(saved_volume)
                .map(|()| Transition::Restored {
                    level: saved_volume,
                    cause,
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingController {
        level: f32,
        unreadable: bool,
        fail_mute: bool,
        fail_restore: bool,
        calls: Vec<String>,
    }

    impl VolumeController for RecordingController {
        fn current_level(&mut self) -> Result<f32, ControllerError> {
            if self.unreadable {
                Err(ControllerError::Other("no mixer".to_string()))
            } else {
                Ok(self.level)
            }
        }
        fn mute(&mut self) -> Result<(), ControllerError> {
            self.calls.push("mute".to_string());
            if self.fail_mute {
                return Err(ControllerError::Other("mute failed".to_string()));
            }
            self.level = 0.0;
            Ok(())
        }
        fn restore(&mut self, level: f32) -> Result<(), ControllerError> {
            self.calls.push(format!("restore({level})"));
            if self.fail_restore {
                return Err(ControllerError::Other("restore failed".to_string()));
            }
            self.level = level;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CountingAlert {
        plays: Vec<f32>,
        fail: bool,
    }

    impl AlertPlayer for CountingAlert {
        fn play(&mut self, volume: f32) -> Result<(), ControllerError> {
            self.plays.push(volume);
            if self.fail {
                Err(ControllerError::Other("no audio device".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn controller_at(level: f32) -> RecordingController {
        RecordingController {
            level,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_table() {
        let idle = MuteState::Idle;
        let muted = MuteState::Muted { saved_volume: 0.6 };

        assert_eq!(plan(&idle, Classification::Advertisement), Action::Mute);
        assert_eq!(plan(&idle, Classification::Content), Action::Nothing);
        assert_eq!(plan(&idle, Classification::Unknown), Action::Nothing);
        assert_eq!(plan(&muted, Classification::Advertisement), Action::Nothing);
        assert_eq!(plan(&muted, Classification::Content), Action::Restore { level: 0.6 });
        assert_eq!(plan(&muted, Classification::Unknown), Action::Restore { level: 0.6 });
    }

    #[test]
    fn test_idle_content_and_unknown_do_nothing() {
        let mut machine = MuteStateMachine::new(true, 0.3);
        let mut controller = controller_at(0.8);
        let mut alert = CountingAlert::default();

        for classification in [Classification::Content, Classification::Unknown] {
            let step = machine
                .step(classification, None, &mut controller, &mut alert)
                .unwrap();
            assert!(step.transition.is_none());
        }
        assert_eq!(machine.state(), MuteState::Idle);
        assert!(controller.calls.is_empty());
        assert!(alert.plays.is_empty());
    }

    #[test]
    fn test_ad_mutes_once_and_saves_volume() {
        let mut machine = MuteStateMachine::new(true, 0.3);
        let mut controller = controller_at(0.8);
        let mut alert = CountingAlert::default();

        let step = machine
            .step(Classification::Advertisement, None, &mut controller, &mut alert)
            .unwrap();
        assert_eq!(step.transition, Some(Transition::Muted { saved_volume: 0.8 }));
        assert_eq!(machine.state(), MuteState::Muted { saved_volume: 0.8 });

        // Second ad tick is debounced
        let step = machine
            .step(Classification::Advertisement, None, &mut controller, &mut alert)
            .unwrap();
        assert!(step.transition.is_none());

        assert_eq!(controller.calls, vec!["mute"]);
        assert_eq!(alert.plays, vec![0.3]);
    }

    #[test]
    fn test_restore_uses_saved_volume_not_a_fresh_reading() {
        let mut machine = MuteStateMachine::new(false, 0.3);
        let mut controller = controller_at(0.8);
        let mut alert = CountingAlert::default();

        machine
            .step(Classification::Advertisement, None, &mut controller, &mut alert)
            .unwrap();
        // Someone nudges the volume during the ad
        controller.level = 0.25;

        let step = machine
            .step(Classification::Content, None, &mut controller, &mut alert)
            .unwrap();
        assert_eq!(
            step.transition,
            Some(Transition::Restored {
                level: 0.8,
                cause: RestoreCause::ContentResumed
            })
        );
        assert_eq!(machine.state(), MuteState::Idle);
        assert_eq!(machine.state().saved_volume(), None);
        assert_eq!(controller.calls, vec!["mute", "restore(0.8)"]);
        assert!(alert.plays.is_empty());
    }

    #[test]
    fn test_unknown_while_muted_fails_open() {
        let mut machine = MuteStateMachine::new(false, 0.3);
        let mut controller = controller_at(0.5);
        let mut alert = CountingAlert::default();

        machine
            .step(Classification::Advertisement, None, &mut controller, &mut alert)
            .unwrap();
        let step = machine
            .step(Classification::Unknown, None, &mut controller, &mut alert)
            .unwrap();

        assert!(matches!(
            step.transition,
            Some(Transition::Restored {
                cause: RestoreCause::PlayerLost,
                ..
            })
        ));
        assert!(!machine.state().is_muted());
    }

    #[test]
    fn test_unreadable_level_falls_back_to_reported_volume() {
        let mut machine = MuteStateMachine::new(false, 0.3);
        let mut controller = RecordingController {
            unreadable: true,
            ..Default::default()
        };
        let mut alert = CountingAlert::default();

        let step = machine
            .step(Classification::Advertisement, Some(0.7), &mut controller, &mut alert)
            .unwrap();
        assert_eq!(step.warnings.len(), 1);
        assert_eq!(machine.state().saved_volume(), Some(0.7));
    }

    #[test]
    fn test_unreadable_level_without_report_uses_fallback() {
        let mut machine = MuteStateMachine::new(false, 0.3);
        let mut controller = RecordingController {
            unreadable: true,
            ..Default::default()
        };
        let mut alert = CountingAlert::default();

        machine
            .step(Classification::Advertisement, None, &mut controller, &mut alert)
            .unwrap();
        assert_eq!(machine.state().saved_volume(), Some(FALLBACK_SAVED_VOLUME));
    }

    #[test]
    fn test_alert_failure_is_a_warning() {
        let mut machine = MuteStateMachine::new(true, 0.3);
        let mut controller = controller_at(0.8);
        let mut alert = CountingAlert {
            fail: true,
            ..Default::default()
        };

        let step = machine
            .step(Classification::Advertisement, None, &mut controller, &mut alert)
            .unwrap();
        assert!(step.transition.is_some());
        assert_eq!(step.warnings.len(), 1);
        assert!(machine.state().is_muted());
    }

    #[test]
    fn test_mute_failure_keeps_saved_volume_for_release() {
        let mut machine = MuteStateMachine::new(true, 0.3);
        let mut controller = RecordingController {
            level: 0.9,
            fail_mute: true,
            ..Default::default()
        };
        let mut alert = CountingAlert::default();

        let result = machine.step(Classification::Advertisement, None, &mut controller, &mut alert);
        assert!(result.is_err());
        assert!(alert.plays.is_empty());

        let released = machine.release(&mut controller, RestoreCause::Shutdown);
        assert!(matches!(released, Some(Ok(Transition::Restored { level, .. })) if level == 0.9));
        assert_eq!(machine.state(), MuteState::Idle);
    }

    #[test]
    fn test_restore_failure_on_content_stays_muted() {
        let mut machine = MuteStateMachine::new(false, 0.3);
        let mut controller = controller_at(0.8);
        let mut alert = CountingAlert::default();
        machine
            .step(Classification::Advertisement, None, &mut controller, &mut alert)
            .unwrap();

        controller.fail_restore = true;
        let result = machine.step(Classification::Content, None, &mut controller, &mut alert);
        assert!(result.is_err());
        assert_eq!(machine.state(), MuteState::Muted { saved_volume: 0.8 });

        controller.fail_restore = false;
        let released = machine.release(&mut controller, RestoreCause::Shutdown);
        assert!(matches!(released, Some(Ok(Transition::Restored { level, .. })) if level == 0.8));
        assert_eq!(controller.calls, vec!["mute", "restore(0.8)", "restore(0.8)"]);
        assert_eq!(machine.state(), MuteState::Idle);
    }

    #[test]
    fn test_release_clears_state_even_when_restore_fails() {
        let mut machine = MuteStateMachine::new(false, 0.3);
        let mut controller = controller_at(0.4);
        let mut alert = CountingAlert::default();
        machine
            .step(Classification::Advertisement, None, &mut controller, &mut alert)
            .unwrap();

        controller.fail_restore = true;
        assert!(matches!(
            machine.release(&mut controller, RestoreCause::Shutdown),
            Some(Err(_))
        ));
        assert_eq!(machine.state(), MuteState::Idle);
        assert!(machine.release(&mut controller, RestoreCause::Shutdown).is_none());
    }
}
