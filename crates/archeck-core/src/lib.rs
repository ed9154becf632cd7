//! archeck-core - Shared infrastructure for the archive checker
//!
//! Cancellation, work distribution, and terminal output (logging and
//! progress) used by the verification pipeline and the CLI.

pub mod logging;
pub mod progress;
pub mod shutdown;
pub mod work_queue;

// Re-exports for convenience
pub use logging::{ProgressLogger, Verbosity, init_logging};
pub use progress::{ProgressContext, SharedProgress};
pub use shutdown::CancelToken;
pub use work_queue::WorkQueue;
