//! Merge a physical directory snapshot into the previous records

use std::collections::BTreeMap;
use std::fmt;

use crate::record::{CheckResult, Record};

/// Current physical state: candidate path → modification time (ns).
pub type Snapshot = BTreeMap<String, i64>;

/// A state transition noticed while reconciling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Path seen for the first time.
    New(String),
    /// Tracked path whose modification time changed; prior result discarded.
    Changed(String),
    /// Tracked path no longer on disk.
    Deleted(String),
    /// Path previously marked deleted is back.
    Reappeared(String),
}

impl Observation {
    pub fn path(&self) -> &str {
        match self {
            Self::New(p) | Self::Changed(p) | Self::Deleted(p) | Self::Reappeared(p) => p,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New(p) => write!(f, "New file detected {p}"),
            Self::Changed(p) => write!(f, "File changed {p}"),
            Self::Deleted(p) => write!(f, "File deleted {p}"),
            Self::Reappeared(p) => write!(f, "File reappeared {p}"),
        }
    }
}

/// Merged records plus the transitions that produced them.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub files: BTreeMap<String, Record>,
    /// In path order.
    pub observations: Vec<Observation>,
}

impl Reconciliation {
    pub fn count(&self, pred: impl Fn(&Observation) -> bool) -> usize {
        self.observations.iter().filter(|o| pred(o)).count()
    }
}

/// Reconcile `previous` records with the `physical` snapshot.
///
/// Per path:
/// - tracked, gone, not yet `deleted` → `deleted`, timestamp kept
/// - tracked, gone, already `deleted` → unchanged
/// - tracked as `deleted`, present → `unchecked` with the observed timestamp
/// - tracked, present, same timestamp → unchanged
/// - tracked, present, new timestamp → `unchecked` with the new timestamp
/// - untracked, present → new `unchecked` record
///
/// Records are never removed. Running this twice on an unchanged snapshot
/// yields identical output.
pub fn reconcile(previous: BTreeMap<String, Record>, physical: &Snapshot) -> Reconciliation {
    let mut files = BTreeMap::new();
    let mut observations = Vec::new();

    for (path, mut record) in previous {
        match physical.get(&path) {
            None => {
                if record.result != CheckResult::Deleted {
                    record.result = CheckResult::Deleted;
                    observations.push(Observation::Deleted(path.clone()));
                }
            }
            Some(&mtime) if record.result == CheckResult::Deleted => {
                record.result = CheckResult::Unchecked;
                record.timestamp = mtime;
                observations.push(Observation::Reappeared(path.clone()));
            }
            Some(&mtime) if record.timestamp != mtime => {
                record.result = CheckResult::Unchecked;
                record.timestamp = mtime;
                observations.push(Observation::Changed(path.clone()));
            }
            Some(_) => {}
        }
        files.insert(path, record);
    }

    for (path, &mtime) in physical {
        if !files.contains_key(path) {
            files.insert(path.clone(), Record::unchecked(mtime));
            observations.push(Observation::New(path.clone()));
        }
    }

    observations.sort_by(|a, b| a.path().cmp(b.path()));
    Reconciliation {
        files,
        observations,
    }
}
