//! Advertisement detection for the currently playing track.
//!
//! Classification is a pure function of the snapshot and the keyword list:
//! no I/O, no hidden state, same answer every time.

use crate::playback::{Classification, PlaybackSnapshot};
use std::time::Duration;

/// Markers that identify ads regardless of user settings.
pub const DEFAULT_AD_KEYWORDS: &[&str] = &["advertisement", "sponsored"];

/// Tracks with empty artist/album shorter than this are treated as ads.
pub const SHORT_AD_THRESHOLD: Duration = Duration::from_secs(45);

/// Keyword-based classifier with the built-in markers merged in.
#[derive(Debug, Clone)]
pub struct AdClassifier {
    /// Case-folded keywords, defaults first, no duplicates
    keywords: Vec<String>,
    short_ad_threshold: Duration,
}

impl Default for AdClassifier {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl AdClassifier {
    /// Build a classifier from user keywords. Blank entries are ignored.
    pub fn new<I, S>(custom_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords: Vec<String> = DEFAULT_AD_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .collect();

        for keyword in custom_keywords {
            let folded = keyword.as_ref().trim().to_lowercase();
            if !folded.is_empty() && !keywords.contains(&folded) {
                keywords.push(folded);
            }
        }

        Self {
            keywords,
            short_ad_threshold: SHORT_AD_THRESHOLD,
        }
    }

    /// Keywords in matching order.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub fn classify(&self, snapshot: &PlaybackSnapshot) -> Classification {
        if !snapshot.player_running {
            return Classification::Unknown;
        }
        let Some(title) = snapshot.track_title.as_deref() else {
            return Classification::Unknown;
        };

        if is_anonymous_short_track(snapshot, self.short_ad_threshold) {
            return Classification::Advertisement;
        }

        let title = title.to_lowercase();
        if self.keywords.iter().any(|k| title.contains(k.as_str())) {
            Classification::Advertisement
        } else {
            Classification::Content
        }
    }
}

/// Classify `snapshot` against the built-in markers plus `keywords`.
#[must_use]
pub fn classify<S: AsRef<str>>(snapshot: &PlaybackSnapshot, keywords: &[S]) -> Classification {
    AdClassifier::new(keywords.iter().map(AsRef::as_ref)).classify(snapshot)
}

// Ads often come through with blank artist and album and a short length.
// Only applies when the backend actually reported all three fields.
fn is_anonymous_short_track(snapshot: &PlaybackSnapshot, threshold: Duration) -> bool {
    match (&snapshot.artist, &snapshot.album, snapshot.duration) {
        (Some(artist), Some(album), Some(duration)) => {
            artist.trim().is_empty() && album.trim().is_empty() && duration < threshold
        }
        _ => false,
    }
}
