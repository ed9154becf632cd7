//! `archeck status` - show stored results without scanning

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color};

use archeck_store::{CheckResult, Store};

use super::new_table;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Directory whose results to show
    pub directory: PathBuf,

    /// Directory holding the result store
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only list files in this state
    #[arg(long, value_parser = parse_result)]
    pub result: Option<CheckResult>,
}

fn parse_result(s: &str) -> Result<CheckResult, String> {
    CheckResult::from_name(&s.to_lowercase()).ok_or_else(|| {
        let names: Vec<_> = CheckResult::ALL.iter().map(|r| r.as_str()).collect();
        format!("unknown result '{s}' (expected one of: {})", names.join(", "))
    })
}

fn result_cell(result: CheckResult) -> Cell {
    let cell = Cell::new(result.as_str());
    match result {
        CheckResult::Success => cell.fg(Color::Green),
        CheckResult::Failure => cell.fg(Color::Red),
        CheckResult::Encrypted => cell.fg(Color::Yellow),
        CheckResult::Deleted => cell.fg(Color::DarkGrey),
        CheckResult::Unchecked => cell,
    }
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let output = args.output.unwrap_or_else(|| config.output.dir.clone());
    let found = archeck_verify::status(&args.directory, &output)
        .with_context(|| format!("Failed to read results for {}", args.directory.display()))?;

    let Some((path, store)) = found else {
        eprintln!(
            "No results for {} in {}.",
            args.directory.display(),
            output.display()
        );
        return Ok(());
    };

    eprintln!("Results from {}", path.display());
    print_files(&store, args.result);
    print_counts(&store);
    Ok(())
}

fn print_files(store: &Store, filter: Option<CheckResult>) {
    let rows: Vec<_> = store
        .files
        .iter()
        .filter(|(_, r)| filter.map_or(true, |f| r.result == f))
        .collect();
    if rows.is_empty() {
        eprintln!("No matching files.");
        return;
    }

    let mut table = new_table(&["File", "Result", "Timestamp"]);
    for (file, record) in &rows {
        table.add_row(vec![
            Cell::new(file),
            result_cell(record.result),
            Cell::new(record.timestamp),
        ]);
    }
    eprintln!("\n{table}");
}

fn print_counts(store: &Store) {
    let mut table = new_table(&["Result", "Files"]);
    for (result, n) in store.counts() {
        table.add_row(vec![result_cell(result), Cell::new(n)]);
    }
    eprintln!("{table}");
    eprintln!("{} files total", store.files.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_result_names() {
        assert_eq!(parse_result("failure"), Ok(CheckResult::Failure));
        assert_eq!(parse_result("Encrypted"), Ok(CheckResult::Encrypted));
        let err = parse_result("broken").unwrap_err();
        assert!(err.contains("unchecked"), "{err}");
    }

    #[test]
    fn status_of_unchecked_directory_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let args = StatusArgs {
            directory: dir.path().to_path_buf(),
            output: Some(out.path().to_path_buf()),
            result: None,
        };
        run(args, &Config::default()).unwrap();
        // read-only: nothing created
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn status_of_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = StatusArgs {
            directory: dir.path().join("gone"),
            output: None,
            result: None,
        };
        let err = run(args, &Config::default()).unwrap_err();
        assert!(format!("{err:#}").contains("does not exist"), "{err:#}");
    }
}
