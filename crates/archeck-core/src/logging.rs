//! Logging setup: env_logger backend, routed through indicatif on a TTY

use indicatif::MultiProgress;

/// Default log level selected from CLI flags (`RUST_LOG` still wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if debug {
            Self::Debug
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    fn default_filter(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Debug => "debug",
        }
    }
}

fn label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

fn color(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// One log line without trailing newline, e.g. `[WARN ] message`.
fn format_line(level: log::Level, args: &std::fmt::Arguments<'_>, ansi: bool) -> String {
    if ansi {
        format!("[{}{}\x1b[0m] {args}", color(level), label(level))
    } else {
        format!("[{}] {args}", label(level))
    }
}

/// Forwards enabled records above the progress bars, colored.
pub struct ProgressLogger {
    filter: env_logger::Logger,
    multi: MultiProgress,
}

impl ProgressLogger {
    pub fn new(filter: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { filter, multi }
    }
}

impl log::Log for ProgressLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), record.args(), true);
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {}
}

/// Install the global logger. Pass `multi` only when stderr is a TTY.
///
/// A second call keeps the first logger.
pub fn init_logging(verbosity: Verbosity, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.default_filter()),
    );

    let Some(multi) = multi else {
        let _ = builder
            .format(|buf, record| {
                writeln!(buf, "{}", format_line(record.level(), record.args(), false))
            })
            .try_init();
        return;
    };

    let filter = builder.build();
    let max_level = filter.filter();
    if log::set_boxed_logger(Box::new(ProgressLogger::new(filter, multi.clone()))).is_ok() {
        log::set_max_level(max_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_debug_wins_over_quiet() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn plain_line_has_no_escape_codes() {
        let line = format_line(log::Level::Warn, &format_args!("disk {}", "full"), false);
        assert_eq!(line, "[WARN ] disk full");
    }

    #[test]
    fn colored_line_wraps_label_only() {
        let line = format_line(log::Level::Error, &format_args!("boom"), true);
        assert_eq!(line, "[\x1b[31mERROR\x1b[0m] boom");
    }

    #[test]
    fn labels_are_aligned() {
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            assert_eq!(label(level).len(), 5);
        }
    }
}
