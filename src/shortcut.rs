//! Double-clickable launcher script.
//!
//! On macOS a `.command` file opens in Terminal when double-clicked, which is
//! the easiest way for non-terminal users to start the monitor. The script
//! just execs the current binary with `run`.

use anyhow::{Context, Result};
use log::{debug, info};
use path_absolutize::Absolutize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SHORTCUT_FILE_NAME: &str = "sam.command";

/// Contents of the launcher for `executable`.
pub fn script_contents(executable: &Path) -> String {
    let exe = executable.to_string_lossy().replace('"', "\\\"");
    format!("#!/bin/bash\nexec \"{exe}\" run\n")
}

/// Where the launcher goes for a configured directory. Relative
/// directories are resolved against the working directory.
pub fn shortcut_path(dir: &Path) -> Result<PathBuf> {
    let dir = dir
        .absolutize()
        .with_context(|| format!("Invalid shortcut directory: {}", dir.display()))?;
    Ok(dir.join(SHORTCUT_FILE_NAME))
}

/// Write the launcher into `dir` unless one is already there.
///
/// Returns the path when a new file was written, `None` if it existed.
pub fn ensure_shortcut(dir: &Path, executable: &Path) -> Result<Option<PathBuf>> {
    let path = shortcut_path(dir)?;
    if path.exists() {
        debug!("Shortcut already present at {}", path.display());
        return Ok(None);
    }

    if !dir.is_dir() {
        anyhow::bail!(
            "Shortcut directory {} does not exist. Please check 'shortcut_script_file_dir' in settings.json",
            dir.display()
        );
    }

    fs::write(&path, script_contents(executable))
        .with_context(|| format!("Failed to write shortcut script {}", path.display()))?;
    make_executable(&path)?;

    info!("Created launcher {}; double-click it to start Sam", path.display());
    Ok(Some(path))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to make {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
