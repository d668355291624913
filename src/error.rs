//! # Error Types
//!
//! Typed errors for the two boundaries where callers need to tell failures
//! apart: the volume/alert collaborators and the settings file. Everything
//! above these boundaries (CLI routing, file plumbing) uses `anyhow`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a `VolumeController` or `AlertPlayer`.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The external command could not be started at all.
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external command ran but reported failure.
    #[error("`{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The external command did not finish in time and was killed.
    #[error("`{program}` timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The command succeeded but its output made no sense.
    #[error("unexpected output from `{program}`: {output:?}")]
    Parse { program: String, output: String },

    /// Any other I/O failure (temporary files, pipes).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic failure with a message, used by fakes and simple backends.
    #[error("{0}")]
    Other(String),
}

/// Malformed or unreadable settings, rejected before monitoring starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
