//! # Playback Data Model
//!
//! Values produced and consumed by a single poll tick: the snapshot read from
//! the player and the classification derived from it.

use chrono::{DateTime, Local};
use std::fmt;
use std::time::Duration;

/// What the player looked like at one instant.
///
/// Built fresh on every tick and never mutated afterwards. Metadata other
/// than the title is optional because not every backend can report it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    /// Whether the monitored player process is alive
    pub player_running: bool,
    /// Title of the current track, `None` if nothing is loaded
    pub track_title: Option<String>,
    /// Whether the track is playing (as opposed to paused or stopped), when
    /// the backend reports it
    pub playing: Option<bool>,
    /// Artist of the current track, when the backend reports it
    pub artist: Option<String>,
    /// Album of the current track, when the backend reports it
    pub album: Option<String>,
    /// Length of the current track, when the backend reports it
    pub duration: Option<Duration>,
    /// Player volume in `0.0..=1.0`
    pub current_volume: Option<f32>,
    /// When the snapshot was taken
    pub timestamp: DateTime<Local>,
}

impl PlaybackSnapshot {
    /// Snapshot for a player that is not running (or could not be queried).
    pub fn absent() -> Self {
        Self {
            player_running: false,
            track_title: None,
            playing: None,
            artist: None,
            album: None,
            duration: None,
            current_volume: None,
            timestamp: Local::now(),
        }
    }

    /// Snapshot for a running player showing `title`.
    pub fn playing(title: impl Into<String>, volume: Option<f32>) -> Self {
        Self {
            player_running: true,
            track_title: Some(title.into()),
            current_volume: volume,
            ..Self::absent()
        }
    }

    /// Record whether the player is playing or paused.
    pub fn with_playing(mut self, playing: bool) -> Self {
        self.playing = Some(playing);
        self
    }

    /// Attach artist/album/duration metadata.
    pub fn with_metadata(
        mut self,
        artist: impl Into<String>,
        album: impl Into<String>,
        duration: Duration,
    ) -> Self {
        self.artist = Some(artist.into());
        self.album = Some(album.into());
        self.duration = Some(duration);
        self
    }
}

/// Play/pause edge observed between two ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackChange {
    Started,
    Stopped,
}

impl PlaybackChange {
    /// Edge between the last known state and `now`. The first known state is
    /// not an edge.
    pub fn between(before: Option<bool>, now: Option<bool>) -> Option<Self> {
        match (before, now) {
            (Some(false), Some(true)) => Some(PlaybackChange::Started),
            (Some(true), Some(false)) => Some(PlaybackChange::Stopped),
            _ => None,
        }
    }
}

/// Verdict for the currently observed track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Content,
    Advertisement,
    /// Player gone or no track loaded. Never causes a mute.
    Unknown,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Content => "content",
            Classification::Advertisement => "advertisement",
            Classification::Unknown => "unknown",
        };
        f.write_str(label)
    }
}
