//! Non-fatal diagnostics.
//!
//! The reader never logs on its own. Every skip or early stop is reported
//! to a [`WarningSink`] handed in by the caller, so parsing stays free of
//! global state and can run on any number of threads at once.

/// Receiver for non-fatal diagnostics.
pub trait WarningSink {
    fn warn(&self, message: &str);
}

impl<F> WarningSink for F
where
    F: Fn(&str),
{
    fn warn(&self, message: &str) {
        self(message)
    }
}

/// Prints warnings to stderr, optionally tagged with the archive they belong to.
#[derive(Debug, Clone, Default)]
pub struct StderrSink {
    prefix: String,
}

impl StderrSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every message, e.g. with the archive path.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn format(&self, message: &str) -> String {
        format!("warning: {}{}", self.prefix, message)
    }
}

impl WarningSink for StderrSink {
    fn warn(&self, message: &str) {
        eprintln!("{}", self.format(message));
    }
}

/// Discards all warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl WarningSink for NullSink {
    fn warn(&self, _message: &str) {}
}
