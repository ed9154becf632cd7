//! `archeck check` - reconcile and verify one directory

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use archeck_core::{CancelToken, SharedProgress};
use archeck_verify::{CommandVerifier, RunConfig, Supervisor};

use crate::config::Config;
use crate::signals::{EXIT_INTERRUPTED, SignalWatcher};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Directory to check recursively
    pub directory: PathBuf,

    /// Path to the 7-Zip executable
    #[arg(short, long)]
    pub seven_zip: Option<PathBuf>,

    /// Also verify .exe files (self-extracting archives)
    #[arg(short, long)]
    pub exe: bool,

    /// Directory for the result store
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel verifications
    #[arg(short, long)]
    pub threads: Option<usize>,
}

impl CheckArgs {
    /// Merge CLI flags over config file values.
    fn run_config(&self, config: &Config) -> RunConfig {
        RunConfig {
            target_dir: self.directory.clone(),
            output_dir: self
                .output
                .clone()
                .unwrap_or_else(|| config.output.dir.clone()),
            include_executables: self.exe || config.scan.include_executables,
            workers: config.workers.resolve(self.threads),
            encryption_markers: config.verifier.encryption_markers.clone(),
        }
    }

    fn verifier(&self, config: &Config) -> CommandVerifier {
        let program = self
            .seven_zip
            .clone()
            .unwrap_or_else(|| config.verifier.program.clone());
        CommandVerifier::new(program, config.verifier.args.clone())
    }
}

pub fn run(args: CheckArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let run_config = args.run_config(config);
    let verifier = args.verifier(config);
    log::debug!(
        "Checking {} with {} ({} workers)",
        run_config.target_dir.display(),
        verifier.program().display(),
        run_config.workers
    );

    let token = CancelToken::new();
    let supervisor = Arc::new(Supervisor::new(token.clone()));
    let watcher = SignalWatcher::spawn(supervisor.clone())?;

    let result = archeck_verify::run(&run_config, &verifier, &supervisor, progress);
    drop(watcher);

    let summary = result
        .with_context(|| format!("Check failed for {}", run_config.target_dir.display()))?;
    summary.log();

    // a signal may also land after the last task finished
    if summary.cancelled || token.is_cancelled() {
        log::warn!("Interrupted; unfinished files will be verified on the next run");
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}
