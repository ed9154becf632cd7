//! Bounded-concurrency verification of pending files
//!
//! Workers claim paths from a shared [`WorkQueue`] and run the per-file
//! protocol independently: check cancellation, run the verifier, classify,
//! then apply the verdict through one [`StoreFile::update`] cycle. The
//! update lock is the only point where workers serialize.

use std::path::Path;
use std::sync::Mutex;

use archeck_core::progress::tail;
use archeck_core::{ProgressContext, WorkQueue};
use archeck_store::{ApplyOutcome, CheckResult, StoreFile};

use crate::error::TaskError;
use crate::supervisor::Supervisor;
use crate::verifier::{Verdict, Verifier, classify_transcript};

/// Counts for one verification phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifySummary {
    pub pending: usize,
    pub success: usize,
    pub failure: usize,
    pub encrypted: usize,
    pub interrupted: usize,
    pub errors: usize,
    /// Gone from disk between reconciliation and dispatch.
    pub vanished: usize,
    /// Never dispatched because cancellation came first.
    pub not_started: usize,
    /// Verdict dropped because the record was deleted meanwhile.
    pub discarded: usize,
}

impl VerifySummary {
    pub fn completed(&self) -> usize {
        self.success + self.failure + self.encrypted
    }

    pub fn log(&self) {
        log::info!(
            "Verified {}/{}: {} ok, {} corrupted, {} encrypted",
            self.completed(),
            self.pending,
            self.success,
            self.failure,
            self.encrypted
        );
        if self.interrupted + self.not_started > 0 {
            log::warn!(
                "{} interrupted, {} not started; they stay unchecked",
                self.interrupted,
                self.not_started
            );
        }
        if self.errors > 0 {
            log::warn!("{} files hit processing errors", self.errors);
        }
        if self.vanished + self.discarded > 0 {
            log::info!(
                "{} vanished before dispatch, {} deleted meanwhile",
                self.vanished,
                self.discarded
            );
        }
    }
}

/// Result of one file's task that is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Recorded(CheckResult),
    Discarded,
    Interrupted,
    Vanished,
    NotStarted,
}

/// Everything a worker needs for the per-file protocol.
pub struct Scheduler<'a> {
    pub store: &'a StoreFile,
    pub verifier: &'a dyn Verifier,
    pub supervisor: &'a Supervisor,
    /// Lowercase encryption markers.
    pub markers: &'a [String],
    pub workers: usize,
}

impl Scheduler<'_> {
    /// Verify every path in `pending`, at most `workers` at a time.
    ///
    /// Call inside a rayon pool sized to `workers`. Returns once every
    /// claimed task finished; after cancellation the rest are never started.
    pub fn verify_pending(
        &self,
        pending: Vec<String>,
        progress: &ProgressContext,
    ) -> VerifySummary {
        let queue = WorkQueue::new(pending);
        let summary = Mutex::new(VerifySummary {
            pending: queue.total(),
            ..Default::default()
        });
        let pb = progress.files_bar("verify", queue.total());

        rayon::scope(|s| {
            for _ in 0..self.workers.max(1) {
                s.spawn(|_| {
                    while !self.supervisor.is_cancelled() {
                        let Some(path) = queue.next() else { break };
                        pb.set_message(tail(path, 60).to_string());
                        let result = self.verify_one(path);
                        pb.inc(1);
                        let mut summary = summary.lock().expect("worker thread panicked");
                        match result {
                            Ok(outcome) => count(&mut summary, outcome),
                            Err(e) => {
                                log::error!("! Processing error {path}: {e}");
                                summary.errors += 1;
                            }
                        }
                    }
                });
            }
        });
        pb.finish_and_clear();

        let mut summary = summary.into_inner().expect("worker thread panicked");
        summary.not_started += queue.remaining();
        summary
    }

    fn verify_one(&self, path: &str) -> Result<TaskOutcome, TaskError> {
        if self.supervisor.is_cancelled() {
            return Ok(TaskOutcome::NotStarted);
        }
        let file = Path::new(path);
        if !file.exists() {
            log::warn!("File vanished before verification {path}");
            return Ok(TaskOutcome::Vanished);
        }

        log::info!("Verifying {path}");
        let transcript = self.verifier.verify(file, self.supervisor)?;
        log::debug!("{path}: exit {:?}", transcript.code);

        let cancelled = self.supervisor.is_cancelled();
        let result = match classify_transcript(&transcript, self.markers, cancelled) {
            Verdict::Done(result) => result,
            Verdict::Interrupted => {
                log::warn!("Verification interrupted {path}");
                return Ok(TaskOutcome::Interrupted);
            }
        };

        match self.store.update(|store| store.apply_verdict(path, result))? {
            ApplyOutcome::Updated => {
                log_verdict(path, result);
                Ok(TaskOutcome::Recorded(result))
            }
            ApplyOutcome::SkippedDeleted | ApplyOutcome::Missing => {
                log::warn!("Record for {path} deleted meanwhile, {result} not recorded");
                Ok(TaskOutcome::Discarded)
            }
        }
    }
}

fn log_verdict(path: &str, result: CheckResult) {
    match result {
        CheckResult::Success => log::info!("Verification passed {path}"),
        CheckResult::Encrypted => log::info!("Encrypted file {path}"),
        CheckResult::Failure => log::warn!("File corrupted {path}"),
        CheckResult::Unchecked | CheckResult::Deleted => {}
    }
}

fn count(summary: &mut VerifySummary, outcome: TaskOutcome) {
    match outcome {
        TaskOutcome::Recorded(CheckResult::Success) => summary.success += 1,
        TaskOutcome::Recorded(CheckResult::Failure) => summary.failure += 1,
        TaskOutcome::Recorded(CheckResult::Encrypted) => summary.encrypted += 1,
        TaskOutcome::Recorded(_) | TaskOutcome::Discarded => summary.discarded += 1,
        TaskOutcome::Interrupted => summary.interrupted += 1,
        TaskOutcome::Vanished => summary.vanished += 1,
        TaskOutcome::NotStarted => summary.not_started += 1,
    }
}
