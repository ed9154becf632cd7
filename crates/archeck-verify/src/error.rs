//! Run-level and per-file error types

use std::path::PathBuf;

use archeck_store::StoreError;

/// Errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Directory {0} does not exist")]
    DirectoryNotFound(PathBuf),

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Verifier not found at {0}")]
    VerifierNotFound(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scan pattern: {0}")]
    Scan(#[from] glob::PatternError),

    #[error("failed to create worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl RunError {
    /// Raised before anything was written.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotFound(_) | Self::NotADirectory(_) | Self::VerifierNotFound(_)
        )
    }
}

/// Error confined to one file's task. The record is left untouched so the
/// file is retried next run.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
