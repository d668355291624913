//! # Configuration Module
//!
//! Settings live in a JSON file in the platform config directory:
//! - Linux: `~/.config/sam/settings.json`
//! - macOS: `~/Library/Application Support/sam/settings.json`
//! - Windows: `%APPDATA%\sam\settings.json`
//!
//! A missing file is created with defaults on first run. A file that exists
//! but cannot be read or parsed is an error: the monitor does not start with
//! settings the user did not ask for.
//!
//! [`Settings`] mirrors the file. [`MonitorConfig`] is the validated subset
//! the monitor actually runs with, fixed for the duration of a run.

use crate::error::ConfigError;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Alert volumes above this are loud enough to startle.
pub const ADVISORY_MAX_ALERT_VOLUME: f32 = 0.7;

/// Polling faster than this mostly burns CPU on `osascript`/`mpc` calls.
pub const ADVISORY_MIN_POLL_INTERVAL: f64 = 0.2;

/// Longest accepted `poll_interval`, and the ceiling for any poll delay.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3600);

/// Returns the platform-appropriate config directory for Sam, creating it
/// if needed.
pub fn get_config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system config directory. Please ensure your platform supports standard config directories."
        )
    })?;

    let sam_dir = base.join("sam");
    fs::create_dir_all(&sam_dir).with_context(|| {
        format!(
            "Failed to create Sam config directory at {}. Please check file permissions.",
            sam_dir.display()
        )
    })?;

    Ok(sam_dir)
}

/// Default location of `settings.json`.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(SETTINGS_FILE_NAME))
}

fn default_shortcut_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Contents of `settings.json`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Write a launcher script on startup if it does not exist
    pub create_shortcut_script_file: bool,
    /// Where the launcher script goes
    pub shortcut_script_file_dir: PathBuf,
    /// Play a tone when an ad gets muted
    pub ad_alert_sound: bool,
    /// Loudness of that tone, `0.0..=1.0`
    pub ad_alert_volume: f32,
    /// Extra title keywords that mark a track as an ad
    pub custom_ad_keywords: Vec<String>,
    /// Seconds between polls
    pub poll_interval: f64,
    /// Growth of the poll delay per quiet tick; 0 keeps it constant
    pub idle_ramp_rate: f64,
    /// Upper bound for the poll delay, as a multiple of `poll_interval`
    pub max_poll_multiplier: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            create_shortcut_script_file: true,
            shortcut_script_file_dir: default_shortcut_dir(),
            ad_alert_sound: true,
            ad_alert_volume: 0.3,
            custom_ad_keywords: Vec::new(),
            poll_interval: 0.3,
            idle_ramp_rate: 0.0,
            max_poll_multiplier: 30.0,
        }
    }
}

impl Settings {
    /// Read settings from `path`, writing defaults there if it is missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Settings::default();
            settings.save(path)?;
            info!("Created default settings at {}", path.display());
            return Ok(settings);
        }
        Ok(Self::load(path)?)
    }

    /// Read settings from an existing file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    /// Check the values and build the run configuration.
    ///
    /// Impossible values are rejected. Merely unwise ones (see the
    /// `ADVISORY_*` constants) are accepted with a warning.
    pub fn to_monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        if !self.poll_interval.is_finite() || self.poll_interval <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "poll_interval",
                reason: format!("must be a positive number of seconds, got {}", self.poll_interval),
            });
        }
        let poll_interval = Duration::try_from_secs_f64(self.poll_interval)
            .ok()
            .filter(|interval| *interval <= MAX_POLL_INTERVAL)
            .ok_or_else(|| ConfigError::Invalid {
                key: "poll_interval",
                reason: format!(
                    "must be at most {} seconds, got {}",
                    MAX_POLL_INTERVAL.as_secs(),
                    self.poll_interval
                ),
            })?;
        if !self.ad_alert_volume.is_finite() || !(0.0..=1.0).contains(&self.ad_alert_volume) {
            return Err(ConfigError::Invalid {
                key: "ad_alert_volume",
                reason: format!("must be between 0.0 and 1.0, got {}", self.ad_alert_volume),
            });
        }
        if !self.idle_ramp_rate.is_finite() || self.idle_ramp_rate < 0.0 {
            return Err(ConfigError::Invalid {
                key: "idle_ramp_rate",
                reason: format!("must be zero or positive, got {}", self.idle_ramp_rate),
            });
        }
        if !self.max_poll_multiplier.is_finite() || self.max_poll_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                key: "max_poll_multiplier",
                reason: format!("must be at least 1.0, got {}", self.max_poll_multiplier),
            });
        }

        if self.ad_alert_volume > ADVISORY_MAX_ALERT_VOLUME {
            warn!(
                "ad_alert_volume {} is above {ADVISORY_MAX_ALERT_VOLUME}; the alert tone may be uncomfortably loud",
                self.ad_alert_volume
            );
        }
        if self.poll_interval < ADVISORY_MIN_POLL_INTERVAL {
            warn!(
                "poll_interval {}s is below {ADVISORY_MIN_POLL_INTERVAL}s; expect high CPU use",
                self.poll_interval
            );
        }

        Ok(MonitorConfig {
            poll_interval,
            ad_keywords: self.custom_ad_keywords.clone(),
            alert_sound_enabled: self.ad_alert_sound,
            alert_volume: self.ad_alert_volume,
            idle_ramp_rate: self.idle_ramp_rate,
            max_poll_multiplier: self.max_poll_multiplier,
        })
    }
}

/// Validated, read-only configuration for one monitor run.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    /// User keywords; the built-in markers are always added on top
    pub ad_keywords: Vec<String>,
    pub alert_sound_enabled: bool,
    pub alert_volume: f32,
    pub idle_ramp_rate: f64,
    pub max_poll_multiplier: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            ad_keywords: Vec::new(),
            alert_sound_enabled: true,
            alert_volume: 0.3,
            idle_ramp_rate: 0.0,
            max_poll_multiplier: 30.0,
        }
    }
}

impl MonitorConfig {
    /// Delay before the next poll after `quiet_ticks` ticks without a state
    /// change: `interval * min(1 + n * ramp, max_multiplier)`, capped at
    /// [`MAX_POLL_INTERVAL`].
    pub fn poll_delay(&self, quiet_ticks: u32) -> Duration {
        let multiplier = (1.0 + f64::from(quiet_ticks) * self.idle_ramp_rate)
            .min(self.max_poll_multiplier)
            .max(1.0);
        let interval = self.poll_interval.min(MAX_POLL_INTERVAL);
        if multiplier <= 1.0 {
            return interval;
        }
        if interval.as_secs_f64() * multiplier >= MAX_POLL_INTERVAL.as_secs_f64() {
            return MAX_POLL_INTERVAL;
        }
        interval.mul_f64(multiplier)
    }

    /// Deadline for a single player/volume command: twice the poll
    /// interval, never below 250 ms.
    pub fn command_timeout(&self) -> Duration {
        self.poll_interval
            .min(MAX_POLL_INTERVAL)
            .saturating_mul(2)
            .max(Duration::from_millis(250))
    }
}
