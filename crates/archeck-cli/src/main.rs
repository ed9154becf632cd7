//! archeck - Incremental archive integrity checker
//!
//! Tracks every archive under a directory in a JSON result store and
//! tests only what is new or changed since the last run.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod signals;

use config::Config;

#[derive(Parser)]
#[command(name = "archeck")]
#[command(about = "Incremental archive integrity checker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Config file path (default: ./archeck.toml or ~/.config/archeck/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a directory with its result store and verify pending archives
    Check(cmd::check::CheckArgs),
    /// Show stored results for a directory without scanning it
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(archeck_core::ProgressContext::new());

    // Logs are routed through the progress bars on a TTY
    let multi = progress.is_tty().then(|| progress.multi());
    archeck_core::init_logging(
        archeck_core::Verbosity::from_flags(cli.quiet, cli.debug),
        multi,
    );

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Check(args) => cmd::check::run(args, &config, &progress),
        Command::Status(args) => cmd::status::run(args, &config).map(|()| ExitCode::SUCCESS),
        Command::Config => {
            cmd::print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}
