//! Verbosity-gated progress output shared by the packager and the CLI.

use std::sync::{Arc, Mutex};

/// Highest accepted verbosity.
pub const MAX_VERBOSITY: u8 = 5;

/// Writes progress lines to stdout when the configured verbosity allows it.
///
/// Level 0 lines are never gated out, but nothing in the crate logs at 0: a verbosity
/// of 0 therefore silences everything except errors, which the CLI writes to stderr
/// on its own.
#[derive(Debug, Clone)]
pub struct Reporter {
    verbosity: u8,
    captured: Option<Arc<Mutex<Vec<String>>>>,
}

impl Reporter {
    pub fn new(verbosity: u8) -> Self {
        Reporter {
            verbosity,
            captured: None,
        }
    }

    /// A reporter that records lines in memory instead of printing them.
    pub fn capturing(verbosity: u8) -> Self {
        Reporter {
            verbosity,
            captured: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn enabled(&self, level: u8) -> bool {
        self.verbosity >= level
    }

    /// Emit `message` iff verbosity >= `level`.
    pub fn log(&self, message: impl AsRef<str>, level: u8) {
        if !self.enabled(level) {
            return;
        }
        let message = message.as_ref();
        match &self.captured {
            Some(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(message.to_owned());
                }
            }
            None => println!("{message}"),
        }
    }

    /// Lines recorded so far by a [`Reporter::capturing`] reporter; empty otherwise.
    pub fn lines(&self) -> Vec<String> {
        self.captured
            .as_ref()
            .and_then(|lines| lines.lock().ok().map(|l| l.clone()))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_on_level() {
        let reporter = Reporter::capturing(2);
        reporter.log("one", 1);
        reporter.log("two", 2);
        reporter.log("three", 3);
        assert_eq!(reporter.lines(), vec!["one", "two"]);
    }

    #[test]
    fn verbosity_zero_suppresses_informational_lines() {
        let reporter = Reporter::capturing(0);
        for level in 1..=MAX_VERBOSITY {
            reporter.log("noise", level);
        }
        assert!(reporter.lines().is_empty());
    }

    #[test]
    fn clones_share_the_capture_buffer() {
        let reporter = Reporter::capturing(1);
        let clone = reporter.clone();
        clone.log("from clone", 1);
        assert_eq!(reporter.lines(), vec!["from clone"]);
    }
}
