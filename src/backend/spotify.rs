//! # Spotify Desktop Backend
//!
//! Drives the Spotify desktop app on macOS through `osascript`. Every script
//! checks `application "Spotify" is running` first, because a bare
//! `tell application "Spotify"` would launch the app.

use super::command::run_checked;
use super::{level_to_percent, percent_to_level, PlayerProbe, VolumeController};
use crate::error::ControllerError;
use crate::playback::PlaybackSnapshot;
use chrono::Local;
use std::time::Duration;

const OSASCRIPT: &str = "osascript";

const IS_RUNNING_SCRIPT: &str = r#"application "Spotify" is running"#;

const TRACK_INFO_SCRIPT: &str = r#"
if application "Spotify" is running then
    tell application "Spotify"
        try
            set t to current track
            return (name of t) & linefeed & (artist of t) & linefeed & (album of t) & linefeed & ((duration of t) as string) & linefeed & ((player state) as string)
        on error
            return ""
        end try
    end tell
end if
return ""
"#;

const PLAYER_STATE_SCRIPT: &str = r#"
if application "Spotify" is running then
    tell application "Spotify" to return (player state) as string
end if
return ""
"#;

const GET_VOLUME_SCRIPT: &str = r#"
if application "Spotify" is running then
    tell application "Spotify" to return sound volume
end if
return ""
"#;

/// Track fields reported by Spotify.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: Option<Duration>,
    pub playing: Option<bool>,
}

/// Handle on the Spotify desktop app.
#[derive(Debug, Clone)]
pub struct SpotifyApp {
    timeout: Duration,
}

impl SpotifyApp {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run(&self, script: &str) -> Result<String, ControllerError> {
        run_checked(OSASCRIPT, &["-e", script], self.timeout)
    }

    fn track_info(&self) -> Result<Option<TrackInfo>, ControllerError> {
        Ok(parse_track_info(&self.run(TRACK_INFO_SCRIPT)?))
    }

    fn volume_percent(&self) -> Result<Option<u32>, ControllerError> {
        let output = self.run(GET_VOLUME_SCRIPT)?;
        if output.is_empty() {
            return Ok(None);
        }
        output
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ControllerError::Parse {
                program: OSASCRIPT.to_string(),
                output,
            })
    }

    fn set_volume_percent(&self, percent: u32) -> Result<(), ControllerError> {
        let script = format!(
            "if application \"Spotify\" is running then\n\
             tell application \"Spotify\" to set sound volume to {percent}\n\
             end if"
        );
        self.run(&script).map(|_| ())
    }
}

impl PlayerProbe for SpotifyApp {
    fn is_running(&mut self) -> Result<bool, ControllerError> {
        Ok(self.run(IS_RUNNING_SCRIPT)? == "true")
    }

    fn current_track_title(&mut self) -> Result<Option<String>, ControllerError> {
        Ok(self.track_info()?.map(|info| info.title))
    }

    fn current_volume(&mut self) -> Result<Option<f32>, ControllerError> {
        Ok(self.volume_percent()?.map(percent_to_level))
    }

    fn is_playing(&mut self) -> Result<Option<bool>, ControllerError> {
        Ok(parse_player_state(&self.run(PLAYER_STATE_SCRIPT)?))
    }

    fn snapshot(&mut self) -> Result<PlaybackSnapshot, ControllerError> {
        if !self.is_running()? {
            return Ok(PlaybackSnapshot::absent());
        }

        let info = self.track_info().unwrap_or(None);
        let current_volume = self.current_volume().unwrap_or(None);

        Ok(match info {
            Some(info) => PlaybackSnapshot {
                player_running: true,
                track_title: Some(info.title),
                playing: info.playing,
                artist: Some(info.artist),
                album: Some(info.album),
                duration: info.duration,
                current_volume,
                timestamp: Local::now(),
            },
            None => PlaybackSnapshot {
                player_running: true,
                current_volume,
                ..PlaybackSnapshot::absent()
            },
        })
    }
}

impl VolumeController for SpotifyApp {
    fn current_level(&mut self) -> Result<f32, ControllerError> {
        self.volume_percent()?
            .map(percent_to_level)
            .ok_or_else(|| ControllerError::Other("Spotify is not running".to_string()))
    }

    fn mute(&mut self) -> Result<(), ControllerError> {
        self.set_volume_percent(0)
    }

    fn restore(&mut self, level: f32) -> Result<(), ControllerError> {
        self.set_volume_percent(level_to_percent(level))
    }
}

/// Parse the reply of the track info script: title, artist, album,
/// duration and player state, one per line.
///
/// An empty reply (no track, or Spotify failed mid-skip) yields `None`.
pub fn parse_track_info(output: &str) -> Option<TrackInfo> {
    if output.trim().is_empty() {
        return None;
    }

    let mut lines = output.lines();
    let title = lines.next()?.trim().to_string();
    let artist = lines.next().unwrap_or("").trim().to_string();
    let album = lines.next().unwrap_or("").trim().to_string();
    // Spotify reports milliseconds
    let duration = lines
        .next()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
        .map(|ms| Duration::from_secs_f64(ms / 1000.0));
    let playing = lines.next().and_then(parse_player_state);

    Some(TrackInfo {
        title,
        artist,
        album,
        duration,
        playing,
    })
}

/// `playing` is `Some(true)`; `paused` and `stopped` are `Some(false)`.
pub fn parse_player_state(state: &str) -> Option<bool> {
    match state.trim() {
        "playing" => Some(true),
        "paused" | "stopped" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_track_info() {
        let info = parse_track_info("Song A\nSome Artist\nSome Album\n215000\n").unwrap();
        assert_eq!(info.title, "Song A");
        assert_eq!(info.artist, "Some Artist");
        assert_eq!(info.album, "Some Album");
        assert_eq!(info.duration, Some(Duration::from_secs(215)));
        assert_eq!(info.playing, None);
    }

    #[test]
    fn test_parse_player_state_line() {
        let info = parse_track_info("Song A
Some Artist
Some Album
215000
playing").unwrap();
        assert_eq!(info.playing, Some(true));

        let info = parse_track_info("Song A
Some Artist
Some Album
215000
paused
").unwrap();
        assert_eq!(info.playing, Some(false));

        assert_eq!(parse_player_state("stopped"), Some(false));
        assert_eq!(parse_player_state("fast forwarding"), None);
    }

    #[test]
    fn test_parse_ad_track_info() {
        let info = parse_track_info("Advertisement\n\n\n30000").unwrap();
        assert_eq!(info.title, "Advertisement");
        assert!(info.artist.is_empty());
        assert!(info.album.is_empty());
        assert_eq!(info.duration, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_track_info("").is_none());
        assert!(parse_track_info("  \n").is_none());
    }

    #[test]
    fn test_parse_bad_duration() {
        let info = parse_track_info("Song\nArtist\nAlbum\nmissing value").unwrap();
        assert_eq!(info.duration, None);
    }
}
