//! Short sine tone announcing that an ad was muted.
//!
//! The tone is rendered into a temporary WAV file with `hound` and handed to
//! the platform's command-line player. The file is removed when the
//! `NamedTempFile` drops.

use super::command::run_with_timeout;
use super::AlertPlayer;
use crate::error::ControllerError;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44_100;

/// Hard cap on how long playing the tone may hold up the monitor.
pub const MAX_ALERT_BLOCK: Duration = Duration::from_secs(1);

/// Sine tone played through an external audio player.
#[derive(Debug, Clone)]
pub struct ToneAlert {
    pub frequency_hz: f32,
    pub duration: Duration,
    player: &'static str,
}

impl Default for ToneAlert {
    fn default() -> Self {
        Self {
            frequency_hz: 180.0,
            duration: Duration::from_millis(300),
            player: platform_player(),
        }
    }
}

impl ToneAlert {
    fn player_args<'a>(&self, wav: &'a str) -> Vec<&'a str> {
        if self.player == "aplay" {
            vec!["-q", wav]
        } else {
            vec![wav]
        }
    }
}

impl AlertPlayer for ToneAlert {
    fn play(&mut self, volume: f32) -> Result<(), ControllerError> {
        let file = tempfile::Builder::new()
            .prefix("sam-tone-")
            .suffix(".wav")
            .tempfile()?;

        write_tone(file.path(), self.frequency_hz, self.duration, volume)?;

        let path = file.path().to_string_lossy().to_string();
        let args = self.player_args(&path);
        run_with_timeout(self.player, &args, MAX_ALERT_BLOCK)?
            .into_stdout(self.player)
            .map(|_| ())
    }
}

fn platform_player() -> &'static str {
    if cfg!(target_os = "macos") {
        "afplay"
    } else {
        "aplay"
    }
}

/// Render `duration` of a mono 16-bit sine at `volume` into `path`.
pub fn write_tone(
    path: &Path,
    frequency_hz: f32,
    duration: Duration,
    volume: f32,
) -> Result<(), ControllerError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let amplitude = volume.clamp(0.0, 1.0) * f32::from(i16::MAX);

    let mut writer = WavWriter::create(path, spec).map_err(wav_error)?;
    for sample in tone_samples(frequency_hz, duration) {
        writer
            .write_sample((sample * amplitude) as i16)
            .map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)
}

/// Unit-amplitude sine samples for the tone.
fn tone_samples(frequency_hz: f32, duration: Duration) -> impl Iterator<Item = f32> {
    let count = (SAMPLE_RATE as f64 * duration.as_secs_f64()) as u32;
    (0..count).map(move |i| (2.0 * PI * frequency_hz * (i as f32 / SAMPLE_RATE as f32)).sin())
}

fn wav_error(e: hound::Error) -> ControllerError {
    match e {
        hound::Error::IoError(io) => ControllerError::Io(io),
        other => ControllerError::Other(format!("failed to write alert tone: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_tone_fits_alert_budget() {
        let tone = ToneAlert::default();
        assert_eq!(tone.frequency_hz, 180.0);
        assert!(tone.duration < MAX_ALERT_BLOCK);
    }

    #[test]
    fn test_write_tone_produces_expected_samples() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("tone.wav");

        write_tone(&path, 180.0, Duration::from_millis(300), 0.3).expect("write tone");

        let reader = hound::WavReader::open(&path).expect("read back");
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.duration(), 13_230);

        let peak = reader
            .into_samples::<i16>()
            .filter_map(Result::ok)
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0);
        let ceiling = (0.3 * f32::from(i16::MAX)) as u16;
        assert!(peak <= ceiling);
        assert!(peak > ceiling / 2);
    }

    #[test]
    fn test_volume_is_clamped() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("loud.wav");
        write_tone(&path, 440.0, Duration::from_millis(50), 4.0).expect("write tone");
        assert!(path.exists());
    }

    #[test]
    fn test_aplay_gets_quiet_flag() {
        let tone = ToneAlert {
            player: "aplay",
            ..ToneAlert::default()
        };
        assert_eq!(tone.player_args("/tmp/x.wav"), vec!["-q", "/tmp/x.wav"]);
    }
}
