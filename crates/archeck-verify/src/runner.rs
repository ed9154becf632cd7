//! One full pass over a directory: preconditions, reconcile, verify

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use archeck_core::ProgressContext;
use archeck_store::{Observation, Store, StoreFile, reconcile};

use crate::classify::Classifier;
use crate::config::RunConfig;
use crate::error::RunError;
use crate::scan::scan;
use crate::scheduler::{Scheduler, VerifySummary};
use crate::supervisor::Supervisor;
use crate::verifier::Verifier;

/// Outcome of a completed (possibly cancelled) run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub target_dir: PathBuf,
    pub store_path: PathBuf,
    /// Records in the store after reconciliation.
    pub tracked: usize,
    pub new: usize,
    pub changed: usize,
    pub deleted: usize,
    pub reappeared: usize,
    pub verify: VerifySummary,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn log(&self) {
        log::info!(
            "{}: {} tracked ({} new, {} changed, {} deleted, {} reappeared)",
            self.target_dir.display(),
            self.tracked,
            self.new,
            self.changed,
            self.deleted,
            self.reappeared
        );
        self.verify.log();
        log::info!("Results saved to {}", self.store_path.display());
    }
}

/// Canonical absolute form of `dir`, which must be an existing directory.
pub fn resolve_target(dir: &Path) -> Result<PathBuf, RunError> {
    let canonical = fs::canonicalize(dir).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RunError::DirectoryNotFound(dir.to_path_buf()),
        _ => RunError::Io {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;
    if !canonical.is_dir() {
        return Err(RunError::NotADirectory(canonical));
    }
    Ok(canonical)
}

/// Run reconcile + verify for `config.target_dir`.
///
/// Precondition failures (missing directory, missing verifier) return
/// before the output directory or store file are touched.
pub fn run(
    config: &RunConfig,
    verifier: &dyn Verifier,
    supervisor: &Supervisor,
    progress: &ProgressContext,
) -> Result<RunSummary, RunError> {
    let target = resolve_target(&config.target_dir)?;
    verifier.ensure_available()?;

    fs::create_dir_all(&config.output_dir).map_err(|source| RunError::Io {
        path: config.output_dir.clone(),
        source,
    })?;
    let store_file = StoreFile::for_directory(&config.output_dir, &target);
    store_file.cleanup_tmp_files()?;

    // Phase 1: reconcile
    let snapshot = scan(&target, &Classifier::new(config.include_executables))?;
    let mut store = store_file.load(&target)?;
    let merged = reconcile(std::mem::take(&mut store.files), &snapshot);
    let new = merged.count(|o| matches!(o, Observation::New(_)));
    let changed = merged.count(|o| matches!(o, Observation::Changed(_)));
    let deleted = merged.count(|o| matches!(o, Observation::Deleted(_)));
    let reappeared = merged.count(|o| matches!(o, Observation::Reappeared(_)));
    for obs in &merged.observations {
        match obs {
            Observation::Deleted(_) => log::warn!("{obs}"),
            _ => log::info!("{obs}"),
        }
    }
    store.files = merged.files;
    store_file.save(&store)?;

    let pending: Vec<String> = store
        .pending()
        .into_iter()
        .filter(|p| Path::new(p).exists())
        .collect();
    log::info!("Found {} files to verify", pending.len());

    // Phase 2: verify
    let workers = config.workers.max(1);
    let markers = config.normalized_markers();
    let scheduler = Scheduler {
        store: &store_file,
        verifier,
        supervisor,
        markers: &markers,
        workers,
    };
    let verify = if pending.is_empty() {
        VerifySummary::default()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("verify-{i}"))
            .build()?;
        pool.install(|| scheduler.verify_pending(pending, progress))
    };

    Ok(RunSummary {
        target_dir: target,
        store_path: store_file.path().to_path_buf(),
        tracked: store.files.len(),
        new,
        changed,
        deleted,
        reappeared,
        verify,
        cancelled: supervisor.is_cancelled(),
    })
}

/// Read the store for `target_dir` without scanning or writing.
///
/// `Ok(None)` if the directory was never checked into `output_dir`.
pub fn status(
    target_dir: &Path,
    output_dir: &Path,
) -> Result<Option<(PathBuf, Store)>, RunError> {
    let target = resolve_target(target_dir)?;
    let store_file = StoreFile::for_directory(output_dir, &target);
    if !store_file.exists() {
        return Ok(None);
    }
    let store = store_file.load(&target)?;
    Ok(Some((store_file.path().to_path_buf(), store)))
}
