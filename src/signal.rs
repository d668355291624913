//! Cooperative stop flag and interruptible waiting.
//!
//! SIGINT/SIGTERM handlers only flip an atomic flag (the one thing a signal
//! handler may safely do). The monitor checks the flag between ticks and
//! sleeps in short slices, so shutdown latency stays around
//! [`WAIT_SLICE`] no matter how long the poll interval is.

use anyhow::{bail, Result};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep.
pub const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Shared "please stop" flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Safe to call from any thread.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || process_signalled()
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `true` if the wait was cut short by a stop request.
    pub fn wait(&self, duration: Duration) -> bool {
        // No representable deadline means waiting until stopped
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.is_triggered() {
                return true;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    WAIT_SLICE.min(deadline - now)
                }
                None => WAIT_SLICE,
            };
            thread::sleep(slice);
        }
    }
}

static SIGNALLED: AtomicBool = AtomicBool::new(false);

fn process_signalled() -> bool {
    SIGNALLED.load(Ordering::SeqCst)
}

#[cfg(unix)]
extern "C" fn on_signal(_signum: libc::c_int) {
    SIGNALLED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to every [`StopSignal`] in the process.
#[cfg(unix)]
pub fn install_handlers() -> Result<()> {
    for signum in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only stores to a static atomic, which is
        // async-signal-safe.
        let previous = unsafe { libc::signal(signum, on_signal as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            bail!("Failed to install handler for signal {signum}");
        }
    }
    debug!("Installed SIGINT/SIGTERM handlers");
    Ok(())
}

#[cfg(not(unix))]
pub fn install_handlers() -> Result<()> {
    debug!("Signal handlers not supported on this platform; Ctrl-C ends the process directly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_runs_full_duration_without_stop() {
        let stop = StopSignal::new();
        let started = Instant::now();
        assert!(!stop.wait(Duration::from_millis(120)));
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_triggered_wait_returns_immediately() {
        let stop = StopSignal::new();
        stop.trigger();
        let started = Instant::now();
        assert!(stop.wait(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stop_from_another_thread_interrupts_wait() {
        let stop = StopSignal::new();
        let remote = stop.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.trigger();
        });

        let started = Instant::now();
        assert!(stop.wait(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(2));
        handle.join().expect("trigger thread");
    }

    #[test]
    fn test_unbounded_wait_still_stops() {
        let stop = StopSignal::new();
        let remote = stop.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            remote.trigger();
        });

        assert!(stop.wait(Duration::MAX));
        handle.join().expect("trigger thread");
    }
}
