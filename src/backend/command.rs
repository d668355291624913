//! Running external helper programs with a deadline.

use crate::error::ControllerError;
use log::debug;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Outcome of a command that ran to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Turn a non-zero exit into `ControllerError::CommandFailed`.
    pub fn into_stdout(self, program: &str) -> Result<String, ControllerError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(ControllerError::CommandFailed {
                program: program.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Run `program args...`, killing it if it is still alive after `timeout`.
///
/// Output is read after the child exits, which is fine for the short
/// replies the player tools produce.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, ControllerError> {
    debug!("Running {program} {args:?} (timeout {timeout:?})");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Own process group, so Ctrl-C in the terminal reaches only Sam and a
    // restore in flight is not killed with it
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|source| ControllerError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let deadline = Instant::now().checked_add(timeout);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ControllerError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }
        thread::sleep(WAIT_SLICE);
    };

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        pipe.read_to_string(&mut stdout)?;
    }
    let mut stderr = String::new();
    if let Some(mut pipe) = child.stderr.take() {
        pipe.read_to_string(&mut stderr)?;
    }

    Ok(CommandOutput {
        success: status.success(),
        status: status.to_string(),
        stdout,
        stderr,
    })
}

/// Run and return trimmed stdout, failing on a non-zero exit.
pub fn run_checked(program: &str, args: &[&str], timeout: Duration) -> Result<String, ControllerError> {
    let stdout = run_with_timeout(program, args, timeout)?.into_stdout(program)?;
    Ok(stdout.trim().to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let output = run_checked("sh", &["-c", "echo hello"], Duration::from_secs(5))
            .expect("sh should run");
        assert_eq!(output, "hello");
    }

    #[test]
    fn test_non_zero_exit_is_command_failed() {
        let err = run_checked("sh", &["-c", "echo nope >&2; exit 3"], Duration::from_secs(5))
            .unwrap_err();
        match err {
            ControllerError::CommandFailed { stderr, .. } => assert_eq!(stderr, "nope"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_slow_command_is_killed() {
        let started = Instant::now();
        let err = run_with_timeout("sleep", &["5"], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, ControllerError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_helper_runs_in_its_own_process_group() {
        // Field 5 of /proc/<pid>/stat is the process group id
        let output = run_checked(
            "sh",
            &["-c", "echo $$; cut -d' ' -f5 /proc/$$/stat"],
            Duration::from_secs(5),
        )
        .expect("sh should run");
        let mut lines = output.lines();
        let pid: i32 = lines.next().unwrap().trim().parse().unwrap();
        let pgid: i32 = lines.next().unwrap().trim().parse().unwrap();

        assert_eq!(pgid, pid);
        assert_ne!(pgid, unsafe { libc::getpgrp() });
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = run_with_timeout("sam-definitely-not-installed", &[], Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, ControllerError::Spawn { .. }));
    }
}
