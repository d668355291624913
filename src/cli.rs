//! # Command-Line Interface Module
//!
//! Clap definitions for the `sam` binary.
//!
//! ## Commands
//!
//! - `run`: Monitor the player and mute ads (default when no command given)
//! - `probe`: Print what the player is doing right now and how it classifies
//! - `settings`: Show, locate or (re)create `settings.json`
//! - `shortcut`: Create the double-clickable launcher script
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! sam
//! sam run --player mpd --keyword "premium"
//! RUST_LOG=debug sam run --poll-interval 0.5
//! ```

use crate::backend::PlayerKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "sam")]
#[command(about = "Sam: mutes advertisements in your music player")]
#[command(version)]
pub struct Args {
    /// Use this settings file instead of the one in the config directory
    #[arg(long, global = true, env = "SAM_SETTINGS", value_hint = clap::ValueHint::FilePath)]
    pub settings: Option<PathBuf>,

    /// The subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Overrides for a monitoring run. Anything not given comes from
/// `settings.json`.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct RunOptions {
    /// Player to monitor (default: spotify on macOS, mpd elsewhere)
    #[arg(long, value_enum)]
    pub player: Option<PlayerKind>,

    /// Seconds between polls
    #[arg(long)]
    pub poll_interval: Option<f64>,

    /// Extra ad keyword, matched case-insensitively against the title
    ///
    /// Can be given several times. Added to the keywords from settings.json.
    #[arg(short, long = "keyword")]
    pub keywords: Vec<String>,

    /// Do not play the alert tone when an ad is muted
    #[arg(long)]
    pub no_alert: bool,

    /// Exit immediately if the player is not running instead of waiting
    #[arg(long)]
    pub no_wait: bool,

    /// Do not create the launcher script on startup
    #[arg(long)]
    pub no_shortcut: bool,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Monitor the player and mute advertisements
    ///
    /// Waits for the player to start, then polls it. When an ad starts the
    /// volume is saved and muted; when music resumes it is restored. Exits
    /// when the player quits or on Ctrl-C, restoring the volume first.
    Run(RunOptions),

    /// Show the current track and how it would be classified
    Probe {
        /// Player to query
        #[arg(long, value_enum)]
        player: Option<PlayerKind>,
    },

    /// Inspect or reset settings.json
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Create the double-clickable launcher script
    ///
    /// Writes `sam.command` into the directory configured in settings.json
    /// (or the one given here) unless it already exists.
    Shortcut {
        /// Directory to write the launcher into
        #[arg(long, value_hint = clap::ValueHint::DirPath)]
        dir: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// Usage: sam completion bash > ~/.local/share/bash-completion/completions/sam
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Settings management actions
#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the effective settings as JSON
    Show,

    /// Print the settings file location
    Path,

    /// Write default settings, keeping an existing file unless --force
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_run() {
        let args = Args::try_parse_from(["sam"]).unwrap();
        assert!(args.command.is_none());
        assert!(args.settings.is_none());
    }

    #[test]
    fn test_run_options() {
        let args = Args::try_parse_from([
            "sam",
            "run",
            "--player",
            "mpd",
            "--poll-interval",
            "0.5",
            "-k",
            "premium",
            "--keyword",
            "promo",
            "--no-alert",
        ])
        .unwrap();

        match args.command {
            Some(Command::Run(opts)) => {
                assert_eq!(opts.player, Some(PlayerKind::Mpd));
                assert_eq!(opts.poll_interval, Some(0.5));
                assert_eq!(opts.keywords, vec!["premium", "promo"]);
                assert!(opts.no_alert);
                assert!(!opts.no_wait);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_settings_init_force() {
        let args = Args::try_parse_from(["sam", "settings", "init", "--force"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Settings {
                action: SettingsAction::Init { force: true }
            })
        ));
    }

    #[test]
    fn test_global_settings_flag_after_subcommand() {
        let args = Args::try_parse_from(["sam", "probe", "--settings", "/tmp/s.json"]).unwrap();
        assert_eq!(args.settings, Some(PathBuf::from("/tmp/s.json")));
    }
}
