//! Mutes advertisements in a music player and restores the volume afterwards.
//!
//! Core modules:
//! - [`monitor`] - The poll loop
//! - [`mute`] - Mute/restore state machine
//! - [`classifier`] - Advertisement detection
//! - [`backend`] - Player, volume and alert collaborators
//!
//! ### Supporting Modules
//!
//! - [`config`] - `settings.json` loading and validation
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//! - [`events`] - Structured monitor events and the logging sink
//! - [`signal`] - Stop flag, SIGINT/SIGTERM handling, interruptible sleep
//! - [`shortcut`] - Launcher script creation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use sam::backend::{self, PlayerKind, ToneAlert};
//! use sam::config::MonitorConfig;
//! use sam::events::LogSink;
//! use sam::monitor::Monitor;
//! use sam::signal::StopSignal;
//!
//! let config = MonitorConfig::default();
//! let (mut probe, mut volume) = backend::open(PlayerKind::Spotify, config.command_timeout());
//! let mut monitor = Monitor::new(config, StopSignal::new());
//!
//! let reason = monitor.run(
//!     probe.as_mut(),
//!     volume.as_mut(),
//!     &mut ToneAlert::default(),
//!     &mut LogSink::default(),
//! );
//! println!("monitor exited: {reason}");
//! ```
//!
//! ## Error Handling
//!
//! Collaborator and settings failures are typed ([`error::ControllerError`],
//! [`error::ConfigError`]); application plumbing uses `anyhow::Result`. The
//! poll loop itself never returns an error: it reports how it ended through
//! [`monitor::ExitReason`].

pub mod backend;
pub mod classifier;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod events;
pub mod monitor;
pub mod mute;
pub mod playback;
pub mod shortcut;
pub mod signal;
