//! External verifier contract and the command-line implementation

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use archeck_store::CheckResult;

use crate::error::{RunError, TaskError};
use crate::supervisor::Supervisor;

/// Exit status and text produced by one verifier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Exit status 0.
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Stdout followed by stderr.
    pub output: String,
}

impl Transcript {
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            output: output.into(),
        }
    }

    pub fn failed(code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            output: output.into(),
        }
    }
}

/// Integrity test for one file.
///
/// Implementations that start processes must run them through
/// [`Supervisor::run`] so cancellation can terminate them.
pub trait Verifier: Send + Sync {
    /// Check the tool is usable before anything is written.
    fn ensure_available(&self) -> Result<(), RunError> {
        Ok(())
    }

    fn verify(&self, path: &Path, supervisor: &Supervisor) -> Result<Transcript, TaskError>;
}

/// How a run's transcript translates into a record update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Done(CheckResult),
    /// Failed while cancellation was active: recorded as nothing, retried next run.
    Interrupted,
}

/// Classify a transcript.
///
/// `markers` must be lowercase. A failing exit that coincides with
/// cancellation is treated as interrupted rather than corrupt, even if the
/// tool had genuinely finished.
pub fn classify_transcript(t: &Transcript, markers: &[String], cancelled: bool) -> Verdict {
    if t.success {
        return Verdict::Done(CheckResult::Success);
    }
    let text = t.output.to_lowercase();
    if markers.iter().any(|m| text.contains(m.as_str())) {
        return Verdict::Done(CheckResult::Encrypted);
    }
    if cancelled {
        return Verdict::Interrupted;
    }
    Verdict::Done(CheckResult::Failure)
}

/// Runs `<program> <args...> <file>` and reports its exit status.
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandVerifier {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Absolute location of the program, searching `PATH` for bare names.
    pub fn resolve(&self) -> Option<PathBuf> {
        resolve_program(&self.program)
    }
}

impl Verifier for CommandVerifier {
    fn ensure_available(&self) -> Result<(), RunError> {
        match self.resolve() {
            Some(_) => Ok(()),
            None => Err(RunError::VerifierNotFound(self.program.clone())),
        }
    }

    fn verify(&self, path: &Path, supervisor: &Supervisor) -> Result<Transcript, TaskError> {
        let program = self.resolve().unwrap_or_else(|| self.program.clone());
        let mut cmd = Command::new(&program);
        cmd.args(&self.args).arg(path);
        let out = supervisor
            .run(&mut cmd)
            .map_err(|source| TaskError::Launch { program, source })?;
        Ok(Transcript {
            success: out.status.success(),
            code: out.status.code(),
            output: out.output,
        })
    }
}

fn resolve_program(program: &Path) -> Option<PathBuf> {
    let bare = program.components().count() == 1 && !program.is_absolute();
    if !bare {
        return program.is_file().then(|| program.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) && program.extension().is_none() {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
