//! SIGINT/SIGTERM handling for a check run
//!
//! First signal: cancel the run (flag + terminate in-flight verifiers).
//! Second signal: exit immediately with [`EXIT_INTERRUPTED`].

use std::sync::Arc;

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};

use archeck_verify::Supervisor;

/// Exit code after an interrupted run (128 + SIGINT).
pub const EXIT_INTERRUPTED: u8 = 130;

/// Watches for termination signals until dropped.
pub struct SignalWatcher {
    #[cfg(unix)]
    handle: signal_hook::iterator::Handle,
    #[cfg(not(unix))]
    done: Arc<std::sync::atomic::AtomicBool>,
}

fn on_signal(supervisor: &Supervisor, signal: i32) {
    if supervisor.cancel() {
        log::error!("Second signal received, exiting");
        std::process::exit(i32::from(EXIT_INTERRUPTED));
    }
    log::warn!(
        "Received signal {signal}, stopping after in-flight verifications (press again to force)"
    );
}

impl SignalWatcher {
    #[cfg(unix)]
    pub fn spawn(supervisor: Arc<Supervisor>) -> Result<Self> {
        use signal_hook::iterator::Signals;

        let mut signals =
            Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
        let handle = signals.handle();
        std::thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    on_signal(&supervisor, signal);
                }
            })
            .context("Failed to spawn signal thread")?;
        Ok(Self { handle })
    }

    /// Handlers only set flags here; a thread polls them and does the cancel.
    #[cfg(not(unix))]
    pub fn spawn(supervisor: Arc<Supervisor>) -> Result<Self> {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let received = Arc::new(AtomicBool::new(false));
        for sig in [SIGINT, SIGTERM] {
            // a signal arriving while the flag is still set exits 130
            signal_hook::flag::register_conditional_shutdown(
                sig,
                i32::from(EXIT_INTERRUPTED),
                received.clone(),
            )
            .context("Failed to install signal handlers")?;
            signal_hook::flag::register(sig, received.clone())
                .context("Failed to install signal handlers")?;
        }
        let done = Arc::new(AtomicBool::new(false));
        let watcher_done = done.clone();
        std::thread::Builder::new()
            .name("signals".to_string())
            .spawn(move || {
                while !watcher_done.load(Ordering::SeqCst) {
                    if received.load(Ordering::SeqCst) && !supervisor.is_cancelled() {
                        on_signal(&supervisor, SIGINT);
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            })
            .context("Failed to spawn signal thread")?;
        Ok(Self { done })
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        #[cfg(unix)]
        self.handle.close();
        #[cfg(not(unix))]
        self.done.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}
