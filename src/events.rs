//! Structured events emitted by the monitor, and the sink that logs them.
//!
//! The monitor never formats output itself. It hands one [`TickEvent`]
//! per notable occurrence to an [`EventSink`]; [`LogSink`] renders them
//! through the `log` facade.

use crate::mute::{RestoreCause, Transition};
use crate::playback::{Classification, PlaybackChange, PlaybackSnapshot};
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};

/// One tick's worth of observation.
#[derive(Debug, Clone, PartialEq)]
pub struct TickEvent {
    pub timestamp: DateTime<Local>,
    pub track_title: Option<String>,
    pub classification: Classification,
    pub transition: Option<Transition>,
    /// Play/pause edge since the previous tick
    pub playback: Option<PlaybackChange>,
    /// Failed player query that was retried within the tick
    pub probe_error: Option<String>,
    /// Problem encountered during the tick, if any
    pub error: Option<String>,
    /// Whether `error` ended the run
    pub fatal: bool,
}

impl TickEvent {
    pub fn new(
        timestamp: DateTime<Local>,
        track_title: Option<String>,
        classification: Classification,
    ) -> Self {
        Self {
            timestamp,
            track_title,
            classification,
            transition: None,
            playback: None,
            probe_error: None,
            error: None,
            fatal: false,
        }
    }
}

/// One-line description of what the player is doing, for the startup
/// banner.
pub fn playback_summary(snapshot: &PlaybackSnapshot) -> String {
    if !snapshot.player_running {
        return "Player is not running".to_string();
    }
    match (snapshot.playing, snapshot.track_title.as_deref()) {
        (Some(true), Some(title)) => format!("Music is playing: {title:?}"),
        (Some(true), None) => "Music is playing".to_string(),
        (Some(false), Some(title)) => format!("No music playing ({title:?} is paused)"),
        (Some(false), None) | (None, None) => "No music playing".to_string(),
        (None, Some(title)) => format!("Current track: {title:?}"),
    }
}

/// Receiver for monitor events.
pub trait EventSink {
    fn emit(&mut self, event: &TickEvent);
}

impl<F: FnMut(&TickEvent)> EventSink for F {
    fn emit(&mut self, event: &TickEvent) {
        self(event)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &TickEvent) {}
}

/// Renders events as the activity log.
#[derive(Debug, Default)]
pub struct LogSink {
    last_classification: Option<Classification>,
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &TickEvent) {
        let at = event.timestamp.format("%Y-%m-%d %H:%M:%S");
        let title = event.track_title.as_deref().unwrap_or("-");

        if self.last_classification != Some(event.classification) {
            debug!("[{at}] now playing {title:?} ({})", event.classification);
            self.last_classification = Some(event.classification);
        }

        match event.playback {
            Some(PlaybackChange::Started) => info!("[{at}] Music started! Now playing {title:?}"),
            Some(PlaybackChange::Stopped) => info!("[{at}] No music playing"),
            None => {}
        }

        match event.transition {
            Some(Transition::Muted { saved_volume }) => {
                info!("[{at}] Ad detected, muting (volume was {saved_volume:.2})");
            }
            Some(Transition::Restored { level, cause }) => match cause {
                RestoreCause::ContentResumed => {
                    info!("[{at}] Ad ended and music resumed, restoring volume to {level:.2}")
                }
                RestoreCause::PlayerLost => {
                    info!("[{at}] Lost track of the player, restoring volume to {level:.2}")
                }
                RestoreCause::Shutdown => {
                    info!("[{at}] Restoring volume to {level:.2} before exit")
                }
            },
            None => {}
        }

        if let Some(err) = &event.probe_error {
            debug!("[{at}] {err}");
        }
        if let Some(err) = &event.error {
            if event.fatal {
                error!("[{at}] {err}");
            } else {
                warn!("[{at}] {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: &TickEvent| seen.push(event.classification);
            sink.emit(&TickEvent::new(Local::now(), None, Classification::Unknown));
            sink.emit(&TickEvent::new(
                Local::now(),
                Some("Song".to_string()),
                Classification::Content,
            ));
        }
        assert_eq!(seen, vec![Classification::Unknown, Classification::Content]);
    }

    #[test]
    fn test_playback_summary() {
        let playing = PlaybackSnapshot::playing("Song A", None).with_playing(true);
        assert_eq!(playback_summary(&playing), "Music is playing: \"Song A\"");

        let paused = PlaybackSnapshot::playing("Song A", None).with_playing(false);
        assert!(playback_summary(&paused).starts_with("No music playing"));

        let unknown = PlaybackSnapshot::playing("Song A", None);
        assert_eq!(playback_summary(&unknown), "Current track: \"Song A\"");

        assert_eq!(playback_summary(&PlaybackSnapshot::absent()), "Player is not running");
    }

    #[test]
    fn test_log_sink_tracks_last_classification() {
        let mut sink = LogSink::default();
        let mut event = TickEvent::new(Local::now(), Some("Ad".to_string()), Classification::Advertisement);
        event.transition = Some(Transition::Muted { saved_volume: 0.8 });
        sink.emit(&event);
        assert_eq!(sink.last_classification, Some(Classification::Advertisement));
    }
}
