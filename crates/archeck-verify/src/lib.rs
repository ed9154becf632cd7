//! archeck-verify: Incremental archive verification
//!
//! One run is two fixed phases over a target directory:
//! 1. scan + reconcile against the stored records, persist the merge
//! 2. verify every still-unchecked file with an external tool, persisting
//!    each result as soon as it is known
//!
//! Interruption at any point leaves a consistent store; files whose
//! verification was cut short stay `unchecked` and are retried next run.

pub mod classify;
pub mod config;
pub mod error;
pub mod runner;
pub mod scan;
pub mod scheduler;
pub mod supervisor;
pub mod verifier;

pub use classify::{Classifier, is_first_volume};
pub use config::RunConfig;
pub use error::{RunError, TaskError};
pub use runner::{RunSummary, run, status};
pub use scan::scan;
pub use scheduler::{Scheduler, VerifySummary};
pub use supervisor::Supervisor;
pub use verifier::{CommandVerifier, Transcript, Verdict, Verifier, classify_transcript};
