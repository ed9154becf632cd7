//! Cooperative cancellation via a shared atomic flag
//!
//! The token is observed at two checkpoints: before a task is dispatched,
//! and when an in-flight task classifies its verifier result. Processes
//! that are already running are stopped by the supervisor, not by the flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle to one cancellation flag.
///
/// All clones observe the same flag. Cancelling is one-way: once set it
/// stays set for the lifetime of the token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation. Returns `true` if it was already requested.
    pub fn cancel(&self) -> bool {
        self.flag.swap(true, Ordering::SeqCst)
    }
}
