//! archeck-store: Persistent verification records for one directory
//!
//! A store maps every tracked archive path to its last verification
//! result and the modification time it was observed with. The store file
//! is always rewritten whole and replaced atomically, so a crash never
//! leaves a half-written file behind.

pub mod error;
pub mod hash;
pub mod reconcile;
pub mod record;
pub mod store;

pub use error::StoreError;
pub use hash::{dir_hash, short_hash};
pub use reconcile::{Observation, Reconciliation, Snapshot, reconcile};
pub use record::{CheckResult, Record};
pub use store::{ApplyOutcome, Store, StoreFile};
