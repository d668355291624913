//! # MPD Backend
//!
//! Talks to Music Player Daemon through the `mpc` command-line client, the
//! same way a user would from a shell:
//!
//! - `mpc version` to check that MPD is reachable
//! - `mpc status -f ...` for the current track, play state, length and volume
//! - `mpc volume N` to mute and restore
//!
//! ## Example Status Output
//!
//! ```text
//! artist/album/song.mp3	Song	Artist	Album
//! [playing] #5/20   1:23/3:45 (37%)
//! volume: 80%   repeat: on    random: off   single: off   consume: off
//! ```
//!
//! When playback is stopped the first two lines are missing.

use super::command::{run_checked, run_with_timeout};
use super::{level_to_percent, percent_to_level, PlayerProbe, VolumeController};
use crate::error::ControllerError;
use crate::playback::PlaybackSnapshot;
use anyhow::{bail, Result};
use chrono::Local;
use log::debug;
use std::time::Duration;

const MPC: &str = "mpc";

/// Tab-separated so titles with spaces survive; bracketed tags print empty
/// when missing.
const STATUS_FORMAT: &str = "%file%\t[%title%]\t[%artist%]\t[%album%]";

/// Currently loaded song as reported by `mpc status`.
#[derive(Debug, Clone, PartialEq)]
pub struct MpdSong {
    pub file: String,
    pub title: String,
    pub artist: String,
    pub album: String,
}

impl MpdSong {
    /// Title tag, falling back to the file name for untagged files.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            self.file.rsplit('/').next().unwrap_or(&self.file)
        } else {
            &self.title
        }
    }
}

/// Parsed `mpc status` output.
#[derive(Debug, Clone, PartialEq)]
pub struct MpdStatus {
    /// Loaded song, `None` when stopped
    pub current_song: Option<MpdSong>,
    /// Playback state: "play", "pause", "stop"
    pub state: String,
    /// Total song duration in seconds, `None` for streams or unknown
    pub duration: Option<f64>,
    /// Mixer volume 0-100, `None` when MPD has no mixer
    pub volume: Option<u32>,
}

impl MpdStatus {
    /// `None` unless MPD reported a play or pause line.
    pub fn is_playing(&self) -> Option<bool> {
        match self.state.as_str() {
            "play" => Some(true),
            "pause" => Some(false),
            _ => None,
        }
    }
}

/// Handle on the local MPD instance.
#[derive(Debug, Clone)]
pub struct MpdClient {
    timeout: Duration,
}

impl MpdClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn status(&self) -> Result<MpdStatus, ControllerError> {
        let output = run_checked(MPC, &["status", "-f", STATUS_FORMAT], self.timeout)?;
        Ok(parse_status(&output))
    }

    fn set_volume(&self, percent: u32) -> Result<(), ControllerError> {
        let percent = percent.to_string();
        run_checked(MPC, &["volume", &percent], self.timeout).map(|_| ())
    }
}

impl PlayerProbe for MpdClient {
    fn is_running(&mut self) -> Result<bool, ControllerError> {
        // mpc itself missing is an error; MPD not answering just means "not running"
        let output = run_with_timeout(MPC, &["version"], self.timeout)?;
        if !output.success {
            debug!("MPD not reachable: {}", output.stderr.trim());
        }
        Ok(output.success)
    }

    fn current_track_title(&mut self) -> Result<Option<String>, ControllerError> {
        Ok(self
            .status()?
            .current_song
            .map(|song| song.display_title().to_string()))
    }

    fn current_volume(&mut self) -> Result<Option<f32>, ControllerError> {
        Ok(self.status()?.volume.map(percent_to_level))
    }

    fn snapshot(&mut self) -> Result<PlaybackSnapshot, ControllerError> {
        if !self.is_running()? {
            return Ok(PlaybackSnapshot::absent());
        }

        match self.status() {
            Ok(status) => Ok(snapshot_from_status(status)),
            Err(e) => {
                debug!("mpc status failed on a running MPD: {e}");
                Ok(PlaybackSnapshot {
                    player_running: true,
                    ..PlaybackSnapshot::absent()
                })
            }
        }
    }

    fn is_playing(&mut self) -> Result<Option<bool>, ControllerError> {
        Ok(self.status()?.is_playing())
    }
}

/// Snapshot of a running MPD.
///
/// Empty tags become `None`: an untagged local file is not an anonymous ad.
fn snapshot_from_status(status: MpdStatus) -> PlaybackSnapshot {
    let playing = status.is_playing();
    let current_volume = status.volume.map(percent_to_level);
    let duration = status.duration.map(Duration::from_secs_f64);
    let tag = |value: String| Some(value).filter(|v| !v.trim().is_empty());

    match status.current_song {
        Some(song) => PlaybackSnapshot {
            player_running: true,
            track_title: Some(song.display_title().to_string()),
            playing,
            artist: tag(song.artist),
            album: tag(song.album),
            duration,
            current_volume,
            timestamp: Local::now(),
        },
        None => PlaybackSnapshot {
            player_running: true,
            playing,
            current_volume,
            ..PlaybackSnapshot::absent()
        },
    }
}

impl VolumeController for MpdClient {
    fn current_level(&mut self) -> Result<f32, ControllerError> {
        let output = run_checked(MPC, &["volume"], self.timeout)?;
        parse_volume_line(&output)
            .map(percent_to_level)
            .ok_or_else(|| ControllerError::Parse {
                program: MPC.to_string(),
                output,
            })
    }

    fn mute(&mut self) -> Result<(), ControllerError> {
        self.set_volume(0)
    }

    fn restore(&mut self, level: f32) -> Result<(), ControllerError> {
        self.set_volume(level_to_percent(level))
    }
}

/// Parse `mpc status -f STATUS_FORMAT` output.
pub fn parse_status(output: &str) -> MpdStatus {
    let lines: Vec<&str> = output.lines().collect();

    let has_state_line = lines
        .iter()
        .any(|l| l.starts_with("[playing]") || l.starts_with("[paused]"));

    let current_song = if has_state_line && !lines.is_empty() {
        parse_song_line(lines[0])
    } else {
        None
    };

    let mut state = "stop";
    let mut duration = None;
    let mut volume = None;

    for line in &lines {
        if line.starts_with("[playing]") || line.starts_with("[paused]") {
            state = if line.starts_with("[playing]") { "play" } else { "pause" };

            // Format: [playing] #1/50   0:32/3:45 (13%)
            if let Some(time_part) = line
                .split_whitespace()
                .find(|s| s.contains('/') && s.contains(':'))
            {
                if let Some((_, total)) = time_part.split_once('/') {
                    duration = parse_time(total).ok().filter(|d| *d > 0.0);
                }
            }
        } else if line.starts_with("volume:") {
            volume = parse_volume_line(line);
        }
    }

    MpdStatus {
        current_song,
        state: state.to_string(),
        duration,
        volume,
    }
}

fn parse_song_line(line: &str) -> Option<MpdSong> {
    let mut fields = line.split('\t');
    let file = fields.next()?.trim().to_string();
    if file.is_empty() {
        return None;
    }
    let mut next = || fields.next().unwrap_or("").trim().to_string();
    let title = next();
    let artist = next();
    let album = next();
    Some(MpdSong {
        file,
        title,
        artist,
        album,
    })
}

/// Extract the percentage from `volume: 80%` (or `volume:100%`).
/// Returns `None` for `volume: n/a`.
pub fn parse_volume_line(line: &str) -> Option<u32> {
    let rest = line.trim().strip_prefix("volume:")?;
    let (number, _) = rest.split_once('%')?;
    number.trim().parse().ok()
}

/// Parse `M:SS` or `H:MM:SS` into seconds.
pub fn parse_time(time_str: &str) -> Result<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    match parts.len() {
        2 | 3 => {
            let mut total = 0.0;
            for part in parts {
                if part.is_empty() {
                    bail!("Invalid time format: {}", time_str);
                }
                total = total * 60.0 + part.parse::<f64>()?;
            }
            Ok(total)
        }
        _ => bail!("Invalid time format: {}", time_str),
    }
}
