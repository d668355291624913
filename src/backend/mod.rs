//! # Player and Volume Backends
//!
//! The monitor only ever talks to the outside world through the three traits
//! in this module. Real implementations shell out to the tools that already
//! know how to drive each player:
//!
//! - [`spotify`] - Spotify desktop app through `osascript` (macOS)
//! - [`mpd`] - Music Player Daemon through `mpc`
//! - [`alert`] - short alert tone played through `afplay`/`aplay`
//!
//! Every external call is bounded by a timeout (see [`command`]); a call that
//! hangs is killed and reported like any other failure.

pub mod alert;
pub mod command;
pub mod mpd;
pub mod spotify;

pub use alert::ToneAlert;

use crate::error::ControllerError;
use crate::playback::PlaybackSnapshot;
use chrono::Local;
use clap::ValueEnum;
use std::time::Duration;

/// Read-only view of the monitored player.
pub trait PlayerProbe {
    /// Whether the player process is alive.
    fn is_running(&mut self) -> Result<bool, ControllerError>;

    /// Title of the loaded track, `None` if nothing is loaded.
    fn current_track_title(&mut self) -> Result<Option<String>, ControllerError>;

    /// Player volume in `0.0..=1.0`, `None` if the player cannot tell.
    fn current_volume(&mut self) -> Result<Option<f32>, ControllerError>;

    /// Playing (`true`) or paused/stopped (`false`), `None` if unknown.
    fn is_playing(&mut self) -> Result<Option<bool>, ControllerError> {
        Ok(None)
    }

    /// Read everything the monitor needs for one tick.
    ///
    /// Only a failed `is_running` query is an error; title and volume
    /// failures on a running player degrade to `None` so the tick can still
    /// be classified (as `Unknown`) and retried next time.
    fn snapshot(&mut self) -> Result<PlaybackSnapshot, ControllerError> {
        if !self.is_running()? {
            return Ok(PlaybackSnapshot::absent());
        }

        Ok(PlaybackSnapshot {
            player_running: true,
            track_title: self.current_track_title().unwrap_or(None),
            playing: self.is_playing().unwrap_or(None),
            artist: None,
            album: None,
            duration: None,
            current_volume: self.current_volume().unwrap_or(None),
            timestamp: Local::now(),
        })
    }
}

/// Output volume the monitor mutes and restores.
///
/// Implementations must tolerate redundant calls: muting while muted and
/// restoring an already restored level are not errors.
pub trait VolumeController {
    /// Level to remember before muting, in `0.0..=1.0`.
    fn current_level(&mut self) -> Result<f32, ControllerError>;

    fn mute(&mut self) -> Result<(), ControllerError>;

    /// Set the output back to `level`, exactly as given.
    fn restore(&mut self, level: f32) -> Result<(), ControllerError>;
}

/// Plays the short "ad detected" tone.
pub trait AlertPlayer {
    /// Best effort. Must return within about a second.
    fn play(&mut self, volume: f32) -> Result<(), ControllerError>;
}

/// Alert player used when the tone is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlert;

impl AlertPlayer for SilentAlert {
    fn play(&mut self, _volume: f32) -> Result<(), ControllerError> {
        Ok(())
    }
}

/// Which player to monitor
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum PlayerKind {
    /// Spotify desktop app (macOS, AppleScript)
    Spotify,
    /// Music Player Daemon via mpc
    Mpd,
}

impl PlayerKind {
    /// Spotify on macOS, MPD everywhere else.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            PlayerKind::Spotify
        } else {
            PlayerKind::Mpd
        }
    }
}

/// Probe and controller for `kind`, each owning its own handle.
pub fn open(
    kind: PlayerKind,
    timeout: Duration,
) -> (Box<dyn PlayerProbe>, Box<dyn VolumeController>) {
    match kind {
        PlayerKind::Spotify => {
            let probe: Box<dyn PlayerProbe> = Box::new(spotify::SpotifyApp::new(timeout));
            let volume: Box<dyn VolumeController> = Box::new(spotify::SpotifyApp::new(timeout));
            (probe, volume)
        }
        PlayerKind::Mpd => {
            let probe: Box<dyn PlayerProbe> = Box::new(mpd::MpdClient::new(timeout));
            let volume: Box<dyn VolumeController> = Box::new(mpd::MpdClient::new(timeout));
            (probe, volume)
        }
    }
}

/// Convert a 0-100 player volume into `0.0..=1.0`.
pub(crate) fn percent_to_level(percent: u32) -> f32 {
    (percent.min(100) as f32) / 100.0
}

/// Convert `0.0..=1.0` into the nearest 0-100 player volume.
pub(crate) fn level_to_percent(level: f32) -> u32 {
    if !level.is_finite() {
        return 0;
    }
    (level.clamp(0.0, 1.0) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyTitleProbe;

    impl PlayerProbe for FlakyTitleProbe {
        fn is_running(&mut self) -> Result<bool, ControllerError> {
            Ok(true)
        }
        fn current_track_title(&mut self) -> Result<Option<String>, ControllerError> {
            Err(ControllerError::Other("track changed mid-query".to_string()))
        }
        fn current_volume(&mut self) -> Result<Option<f32>, ControllerError> {
            Ok(Some(0.4))
        }
        fn is_playing(&mut self) -> Result<Option<bool>, ControllerError> {
            Ok(Some(true))
        }
    }

    #[test]
    fn test_snapshot_degrades_title_failure_to_none() {
        let snapshot = FlakyTitleProbe.snapshot().expect("running probe");
        assert!(snapshot.player_running);
        assert!(snapshot.track_title.is_none());
        assert_eq!(snapshot.current_volume, Some(0.4));
        assert_eq!(snapshot.playing, Some(true));
    }

    #[test]
    fn test_percent_conversions() {
        assert_eq!(percent_to_level(80), 0.8);
        assert_eq!(percent_to_level(250), 1.0);
        assert_eq!(level_to_percent(0.8), 80);
        assert_eq!(level_to_percent(1.7), 100);
        assert_eq!(level_to_percent(-0.2), 0);
        assert_eq!(level_to_percent(f32::NAN), 0);
    }

    #[test]
    fn test_silent_alert_never_fails() {
        assert!(SilentAlert.play(0.3).is_ok());
    }
}
