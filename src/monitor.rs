//! # Ad Monitor
//!
//! The poll loop that ties everything together. Each tick:
//!
//! 1. stop if a stop was requested (restoring the volume first)
//! 2. read a [`PlaybackSnapshot`] from the player; a failed read counts as
//!    "player not running"
//! 3. if the player is gone, confirm once, restore if muted, and exit
//! 4. otherwise classify, let the [`MuteStateMachine`] act, note play/pause
//!    edges, and sleep
//!
//! Ticks never overlap: the loop is single-threaded and every collaborator
//! call is synchronous with its own timeout. The only outside influence is
//! the [`StopSignal`], checked between ticks and during sleeps.

use crate::backend::{AlertPlayer, PlayerProbe, VolumeController};
use crate::classifier::AdClassifier;
use crate::config::MonitorConfig;
use crate::error::ControllerError;
use crate::events::{EventSink, TickEvent};
use crate::mute::{MuteStateMachine, RestoreCause};
use crate::playback::{Classification, PlaybackChange, PlaybackSnapshot};
use crate::signal::StopSignal;
use chrono::Local;
use log::debug;
use std::fmt;
use std::time::Duration;

/// How long to wait before believing the player has really quit.
pub const DEFAULT_ABSENCE_CONFIRM: Duration = Duration::from_secs(1);

/// Why [`Monitor::run`] returned.
#[derive(Debug)]
pub enum ExitReason {
    /// A stop was requested (Ctrl-C, SIGTERM, or [`StopSignal::trigger`])
    UserStop,
    /// The monitored player is no longer running
    PlayerClosed,
    /// Muting or restoring failed; the loop could not guarantee a way back
    FatalControllerError(ControllerError),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::UserStop => f.write_str("stopped by user"),
            ExitReason::PlayerClosed => f.write_str("player closed"),
            ExitReason::FatalControllerError(e) => write!(f, "volume control failed: {e}"),
        }
    }
}

/// Poll loop state for one run.
#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    classifier: AdClassifier,
    machine: MuteStateMachine,
    stop: StopSignal,
    absence_confirm: Duration,
    /// Last play/pause state the player reported
    last_playing: Option<bool>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, stop: StopSignal) -> Self {
        let classifier = AdClassifier::new(&config.ad_keywords);
        Self::with_classifier(config, classifier, stop)
    }

    pub fn with_classifier(config: MonitorConfig, classifier: AdClassifier, stop: StopSignal) -> Self {
        let machine = MuteStateMachine::new(config.alert_sound_enabled, config.alert_volume);
        Self {
            config,
            classifier,
            machine,
            stop,
            absence_confirm: DEFAULT_ABSENCE_CONFIRM,
            last_playing: None,
        }
    }

    /// Change the pause before re-checking a player that seems to have quit.
    pub fn absence_confirm(mut self, delay: Duration) -> Self {
        self.absence_confirm = delay;
        self
    }

    pub fn state_machine(&self) -> &MuteStateMachine {
        &self.machine
    }

    /// Poll until the player closes, a stop arrives, or volume control fails.
    ///
    /// The output is never left muted on return if a restore is at all
    /// possible.
    pub fn run<P, V, A, E>(
        &mut self,
        probe: &mut P,
        controller: &mut V,
        alert: &mut A,
        sink: &mut E,
    ) -> ExitReason
    where
        P: PlayerProbe + ?Sized,
        V: VolumeController + ?Sized,
        A: AlertPlayer + ?Sized,
        E: EventSink + ?Sized,
    {
        let mut quiet_ticks: u32 = 0;

        loop {
            if self.stop.is_triggered() {
                self.release(controller, sink, RestoreCause::Shutdown);
                return ExitReason::UserStop;
            }

            let (mut snapshot, mut probe_error) = read_snapshot(probe);

            if !snapshot.player_running {
                // Quitting players sometimes answer "not running" for a moment
                if self.stop.wait(self.absence_confirm) {
                    continue;
                }
                let (retried, retry_error) = read_snapshot(probe);
                snapshot = retried;
                probe_error = retry_error.or(probe_error);

                if !snapshot.player_running {
                    debug!("Player confirmed absent");
                    let mut event = TickEvent::new(snapshot.timestamp, None, Classification::Unknown);
                    event.probe_error = probe_error;
                    sink.emit(&event);
                    self.release(controller, sink, RestoreCause::PlayerLost);
                    return ExitReason::PlayerClosed;
                }
            }

            let classification = self.classifier.classify(&snapshot);
            let mut event = TickEvent::new(
                snapshot.timestamp,
                snapshot.track_title.clone(),
                classification,
            );
            event.probe_error = probe_error;
            event.playback = PlaybackChange::between(self.last_playing, snapshot.playing);
            if snapshot.playing.is_some() {
                self.last_playing = snapshot.playing;
            }

            match self
                .machine
                .step(classification, snapshot.current_volume, controller, alert)
            {
                Ok(step) => {
                    if !step.warnings.is_empty() {
                        let warnings: Vec<String> =
                            step.warnings.iter().map(ToString::to_string).collect();
                        event.error = Some(warnings.join("; "));
                    }
                    event.transition = step.transition;
                }
                Err(e) => {
                    event.error = Some(format!("Volume control failed: {e}"));
                    event.fatal = true;
                    sink.emit(&event);
                    self.release(controller, sink, RestoreCause::Shutdown);
                    return ExitReason::FatalControllerError(e);
                }
            }

            quiet_ticks = next_quiet_ticks(quiet_ticks, &event);
            sink.emit(&event);

            self.stop.wait(self.config.poll_delay(quiet_ticks));
        }
    }

    /// Best-effort restore; reports the outcome as its own event.
    fn release<V, E>(&mut self, controller: &mut V, sink: &mut E, cause: RestoreCause)
    where
        V: VolumeController + ?Sized,
        E: EventSink + ?Sized,
    {
        let Some(result) = self.machine.release(controller, cause) else {
            return;
        };

        let mut event = TickEvent::new(Local::now(), None, Classification::Unknown);
        match result {
            Ok(transition) => event.transition = Some(transition),
            Err(e) => event.error = Some(format!("Could not restore volume: {e}")),
        }
        sink.emit(&event);
    }
}

/// Run one monitor session with a fresh state machine.
pub fn run<P, V, A, E>(
    config: &MonitorConfig,
    probe: &mut P,
    classifier: &AdClassifier,
    controller: &mut V,
    alert: &mut A,
    stop: &StopSignal,
    sink: &mut E,
) -> ExitReason
where
    P: PlayerProbe + ?Sized,
    V: VolumeController + ?Sized,
    A: AlertPlayer + ?Sized,
    E: EventSink + ?Sized,
{
    Monitor::with_classifier(config.clone(), classifier.clone(), stop.clone())
        .run(probe, controller, alert, sink)
}

/// Block until the player is running. Returns `false` if stopped first.
///
/// Uses the same idle ramp as the poll loop, so a long wait does not keep
/// spawning helper processes at full rate.
pub fn wait_for_player<P>(probe: &mut P, config: &MonitorConfig, stop: &StopSignal) -> bool
where
    P: PlayerProbe + ?Sized,
{
    let mut attempts: u32 = 0;
    loop {
        if stop.is_triggered() {
            return false;
        }
        match probe.is_running() {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => debug!("Player check failed while waiting: {e}"),
        }
        if stop.wait(config.poll_delay(attempts)) {
            return false;
        }
        attempts = attempts.saturating_add(1);
    }
}

/// Mute transitions and music starting reset the idle ramp.
fn next_quiet_ticks(quiet_ticks: u32, event: &TickEvent) -> u32 {
    if event.transition.is_some() || event.playback == Some(PlaybackChange::Started) {
        0
    } else {
        quiet_ticks.saturating_add(1)
    }
}

fn read_snapshot<P>(probe: &mut P) -> (PlaybackSnapshot, Option<String>)
where
    P: PlayerProbe + ?Sized,
{
    match probe.snapshot() {
        Ok(snapshot) => (snapshot, None),
        Err(e) => {
            debug!("Player query failed, treating as not running: {e}");
            (PlaybackSnapshot::absent(), Some(format!("Player query failed: {e}")))
        }
    }
}
