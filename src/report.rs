//! Process-level reporting: the tracing subscriber, error output and exit codes.
//!
//! Progress lines go through [`Reporter`], which lives in the core crate so the
//! packager can use it too.

pub use sugar_packager_core::report::Reporter;

use std::io::IsTerminal;

use anyhow::anyhow;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::usage_text;
use crate::error::CliError;

/// Diagnostic level for a verbosity: 0 errors only, 1 warnings, 2 info, 3 debug, 4+ trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::ERROR,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global `fmt` subscriber, writing to stderr so stdout stays for progress lines.
pub fn init_tracing(verbosity: u8) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("could not initialise tracing: {e}"))
}

/// Render an error the way the process shows it, without the usage text.
pub fn error_line(err: &CliError) -> String {
    format!("Error: {err}")
}

/// Write `err` to stderr (after the usage text for usage errors) and return the exit code.
///
/// Runs regardless of verbosity.
pub fn fail(err: &CliError) -> i32 {
    if matches!(err, CliError::Usage(_)) {
        println!("{}", usage_text());
    }
    eprintln!("{}", error_line(err));
    err.exit_code()
}
