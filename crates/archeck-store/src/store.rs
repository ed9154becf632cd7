//! Store document and its on-disk file
//!
//! File layout:
//! ```text
//! {output}/
//! ├── result_{hash8}.json               # one per scanned directory
//! └── result_{hash8}.json.tmp.{pid}.{n} # transient, renamed over the store
//! ```
//!
//! Every write goes to a fresh temporary file next to the destination and
//! is then renamed over it, so readers see either the old or the new
//! document. All load-modify-save cycles go through [`StoreFile::update`],
//! which holds one lock for the whole cycle. Temporary files left behind
//! by another process are removed once older than [`STALE_TMP_AGE`].

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::hash;
use crate::record::{CheckResult, Record};

/// Distinguishes temporary files of concurrent writers within one process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Minimum age before another process's temporary file is considered abandoned.
pub const STALE_TMP_AGE: Duration = Duration::from_secs(600);

/// Full persisted state for one target directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    /// Canonical absolute path the store was built for.
    pub target_directory: String,
    /// Path → record, iterated in lexicographic path order.
    #[serde(default)]
    pub files: BTreeMap<String, Record>,
    /// Top-level fields written by newer versions.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// What happened when a verifier verdict was applied to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Updated,
    /// Record was marked deleted meanwhile; left as is.
    SkippedDeleted,
    /// Path is not tracked by this store.
    Missing,
}

impl Store {
    pub fn new(target_directory: &Path) -> Self {
        Self {
            target_directory: target_directory.to_string_lossy().into_owned(),
            files: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Paths still waiting for verification, in path order.
    pub fn pending(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, r)| r.needs_check())
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Number of records per result; every state is present (possibly zero).
    pub fn counts(&self) -> BTreeMap<CheckResult, usize> {
        let mut counts: BTreeMap<CheckResult, usize> =
            CheckResult::ALL.into_iter().map(|r| (r, 0)).collect();
        for record in self.files.values() {
            *counts.entry(record.result).or_default() += 1;
        }
        counts
    }

    /// Record a verifier verdict for `path`.
    ///
    /// A record concurrently marked `deleted` is never resurrected into a
    /// verified state.
    pub fn apply_verdict(&mut self, path: &str, verdict: CheckResult) -> ApplyOutcome {
        debug_assert!(verdict.is_verdict(), "not a verdict: {verdict}");
        match self.files.get_mut(path) {
            None => ApplyOutcome::Missing,
            Some(r) if r.result == CheckResult::Deleted => ApplyOutcome::SkippedDeleted,
            Some(r) => {
                r.result = verdict;
                ApplyOutcome::Updated
            }
        }
    }

    fn to_json(&self) -> Result<Vec<u8>, StoreError> {
        let mut buf = serde_json::to_vec_pretty(self).map_err(StoreError::Serialize)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

/// The store file for one directory, plus the lock serializing its writers.
#[derive(Debug)]
pub struct StoreFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store file for `canonical_dir` inside `output_dir`.
    pub fn for_directory(output_dir: &Path, canonical_dir: &Path) -> Self {
        Self::new(output_dir.join(hash::store_file_name(canonical_dir)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the store for `target`, or an empty one if no file exists yet.
    ///
    /// A file that exists but does not parse is [`StoreError::Corrupt`].
    pub fn load(&self, target: &Path) -> Result<Store, StoreError> {
        let store = match self.read()? {
            Some(store) => store,
            None => return Ok(Store::new(target)),
        };
        let expected = target.to_string_lossy();
        if store.target_directory != expected {
            return Err(StoreError::TargetMismatch {
                path: self.path.clone(),
                expected: expected.into_owned(),
                found: store.target_directory,
            });
        }
        Ok(store)
    }

    /// Read the file as-is. `None` if it does not exist.
    pub fn read(&self) -> Result<Option<Store>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Atomically replace the file with `store`.
    pub fn save(&self, store: &Store) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("store writer panicked");
        self.save_locked(store)
    }

    /// Load-modify-save under the write lock.
    ///
    /// The store file must already exist (it is written after
    /// reconciliation, before any verification starts).
    pub fn update<T>(&self, f: impl FnOnce(&mut Store) -> T) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().expect("store writer panicked");
        let mut store = self.read()?.ok_or_else(|| {
            StoreError::io(
                &self.path,
                io::Error::new(io::ErrorKind::NotFound, "store file disappeared"),
            )
        })?;
        let out = f(&mut store);
        self.save_locked(&store)?;
        Ok(out)
    }

    fn save_locked(&self, store: &Store) -> Result<(), StoreError> {
        let tmp = self.write_tmp(store)?;
        self.commit(&tmp)
    }

    /// First half of a save: the complete document in a unique temporary file.
    pub(crate) fn write_tmp(&self, store: &Store) -> Result<PathBuf, StoreError> {
        let json = store.to_json()?;
        let tmp = self.tmp_path();
        let result = File::create(&tmp).and_then(|mut f| {
            f.write_all(&json)?;
            f.sync_all()
        });
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&tmp, e));
        }
        Ok(tmp)
    }

    /// Second half of a save: rename the temporary file over the store.
    pub(crate) fn commit(&self, tmp: &Path) -> Result<(), StoreError> {
        if let Err(e) = fs::rename(tmp, &self.path) {
            let _ = fs::remove_file(tmp);
            return Err(StoreError::io(&self.path, e));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}{}.{seq}", self.tmp_prefix(), std::process::id());
        self.path.with_file_name(name)
    }

    fn tmp_prefix(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{file_name}.tmp.")
    }

    /// Remove leftover temporary files of writers that died before renaming.
    ///
    /// A file counts as stale only if another process wrote it and it was
    /// last modified more than [`STALE_TMP_AGE`] ago; a concurrent writer's
    /// in-flight file is renamed long before that. Returns how many were
    /// removed. The store file itself is never touched.
    pub fn cleanup_tmp_files(&self) -> Result<usize, StoreError> {
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = self.tmp_prefix();
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };
        let own_pid = std::process::id();
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(suffix) = name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
                continue;
            };
            if tmp_writer_pid(suffix) == Some(own_pid) {
                continue;
            }
            let path = entry.path();
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| SystemTime::now().duration_since(t).ok());
            if age.map_or(true, |a| a < STALE_TMP_AGE) {
                log::debug!("Keeping recent tmp file: {}", path.display());
                continue;
            }
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// `{pid}.{seq}` → pid
fn tmp_writer_pid(suffix: &str) -> Option<u32> {
    suffix.split('.').next()?.parse().ok()
}
