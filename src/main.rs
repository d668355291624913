//! # Sam - Ad Muter
//!
//! Watches a music player, mutes it while an advertisement plays and puts the
//! volume back when the music resumes.
//!
//! ## Usage
//!
//! ```bash
//! # Monitor with settings from settings.json
//! sam
//!
//! # Monitor MPD with an extra keyword and no alert tone
//! sam run --player mpd --keyword premium --no-alert
//!
//! # What is playing right now?
//! sam probe
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info, warn};
use sam::backend::{self, AlertPlayer, PlayerKind, SilentAlert, ToneAlert};
use sam::classifier::AdClassifier;
use sam::cli::{self, RunOptions, SettingsAction};
use sam::config::{self, Settings};
use sam::events::{self, LogSink};
use sam::monitor::{self, ExitReason, Monitor};
use sam::signal::{self, StopSignal};
use sam::{completion, shortcut};
use std::path::Path;

/// Main entry point for Sam.
///
/// Initializes logging, parses command-line arguments, and routes commands.
///
/// # Logging
///
/// The activity log goes through `env_logger` at `info` level by default:
/// - `RUST_LOG=debug sam` - Show every classification change and command
/// - `RUST_LOG=sam::backend=debug sam` - Only backend chatter
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Args::parse();
    let command = args.command.unwrap_or(cli::Command::Run(RunOptions::default()));

    if let cli::Command::Completion { shell } = &command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let settings_path = match args.settings {
        Some(path) => path,
        None => config::get_settings_path()?,
    };

    match command {
        cli::Command::Run(opts) => run(&settings_path, opts)?,
        cli::Command::Probe { player } => probe(&settings_path, player)?,
        cli::Command::Settings { action } => settings(&settings_path, action)?,
        cli::Command::Shortcut { dir } => {
            let settings = Settings::load_or_create(&settings_path)?;
            let dir = dir.unwrap_or(settings.shortcut_script_file_dir);
            let exe = std::env::current_exe().context("Could not locate the sam executable")?;
            match shortcut::ensure_shortcut(&dir, &exe)? {
                Some(path) => println!("Created {}", path.display()),
                None => println!("{} already exists", shortcut::shortcut_path(&dir)?.display()),
            }
        }
        cli::Command::Completion { .. } => {}
    }

    Ok(())
}

/// Load settings and fold in command-line overrides.
fn load_settings(path: &Path, opts: &RunOptions) -> Result<Settings> {
    let mut settings = Settings::load_or_create(path)?;
    if let Some(interval) = opts.poll_interval {
        settings.poll_interval = interval;
    }
    if opts.no_alert {
        settings.ad_alert_sound = false;
    }
    settings.custom_ad_keywords.extend(opts.keywords.iter().cloned());
    Ok(settings)
}

fn run(settings_path: &Path, opts: RunOptions) -> Result<()> {
    let settings = load_settings(settings_path, &opts)?;
    let config = settings
        .to_monitor_config()
        .with_context(|| format!("Invalid settings in {}", settings_path.display()))?;

    println!("\n🎧 Sam started [Version {}]", env!("CARGO_PKG_VERSION"));

    if settings.create_shortcut_script_file && !opts.no_shortcut {
        create_shortcut(&settings.shortcut_script_file_dir);
    }

    signal::install_handlers()?;
    let stop = StopSignal::new();

    let kind = opts.player.unwrap_or_else(PlayerKind::platform_default);
    let (mut probe, mut volume) = backend::open(kind, config.command_timeout());
    let mut alert: Box<dyn AlertPlayer> = if config.alert_sound_enabled {
        Box::new(ToneAlert::default())
    } else {
        Box::new(SilentAlert)
    };

    if opts.no_wait {
        if !probe.is_running().unwrap_or(false) {
            info!("{kind:?} is not running. Nothing to do.");
            return Ok(());
        }
    } else {
        info!("Sam is waiting for {kind:?}...");
        if !monitor::wait_for_player(probe.as_mut(), &config, &stop) {
            info!("User ended the program. Sam is going to sleep...");
            return Ok(());
        }
    }
    info!("{kind:?} is running. Sam will mute it while ads are playing.");
    match probe.snapshot() {
        Ok(snapshot) => info!("{}", events::playback_summary(&snapshot)),
        Err(e) => debug!("Could not read the initial playback state: {e}"),
    }

    let mut monitor = Monitor::new(config, stop);
    let reason = monitor.run(
        probe.as_mut(),
        volume.as_mut(),
        alert.as_mut(),
        &mut LogSink::default(),
    );

    match reason {
        ExitReason::UserStop => {
            info!("User ended the program. Sam is going to sleep...");
            Ok(())
        }
        ExitReason::PlayerClosed => {
            info!("{kind:?} closed. Sam is going to sleep...");
            Ok(())
        }
        ExitReason::FatalControllerError(e) => Err(anyhow::Error::new(e)
            .context("Sam could not control the player volume. Try restarting the program")),
    }
}

fn create_shortcut(dir: &Path) {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            warn!("Could not locate the sam executable for the launcher: {e}");
            return;
        }
    };
    if let Err(e) = shortcut::ensure_shortcut(dir, &exe) {
        warn!("Unable to create shortcut script: {e:#}");
    }
}

fn probe(settings_path: &Path, player: Option<PlayerKind>) -> Result<()> {
    let settings = Settings::load_or_create(settings_path)?;
    let config = settings.to_monitor_config()?;
    let kind = player.unwrap_or_else(PlayerKind::platform_default);
    let (mut probe, _volume) = backend::open(kind, config.command_timeout());

    let snapshot = probe
        .snapshot()
        .with_context(|| format!("Failed to query {kind:?}"))?;
    let classification = AdClassifier::new(&config.ad_keywords).classify(&snapshot);

    println!("player:         {kind:?}");
    println!("running:        {}", snapshot.player_running);
    println!("title:          {}", snapshot.track_title.as_deref().unwrap_or("-"));
    match snapshot.playing {
        Some(true) => println!("state:          playing"),
        Some(false) => println!("state:          paused"),
        None => println!("state:          -"),
    }
    if let Some(artist) = &snapshot.artist {
        println!("artist:         {artist}");
    }
    if let Some(album) = &snapshot.album {
        println!("album:          {album}");
    }
    if let Some(duration) = snapshot.duration {
        println!("duration:       {:.0}s", duration.as_secs_f64());
    }
    match snapshot.current_volume {
        Some(level) => println!("volume:         {level:.2}"),
        None => println!("volume:         -"),
    }
    println!("classification: {classification}");
    Ok(())
}

fn settings(path: &Path, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = Settings::load_or_create(path)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Path => println!("{}", path.display()),
        SettingsAction::Init { force } => {
            if path.exists() && !force {
                println!("{} already exists (use --force to overwrite)", path.display());
            } else {
                Settings::default().save(path)?;
                println!("Wrote default settings to {}", path.display());
            }
        }
    }
    Ok(())
}
