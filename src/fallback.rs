// SPDX-License-Identifier: MIT OR Apache-2.0

//! The always-available error channel of the pipeline.
//!
//! Nothing that goes wrong inside the delivery pipeline is ever surfaced to a
//! producer. Instead, every internally caught failure (an unresolved target
//! key, a backend panic, a file backend disabling itself) is reported exactly
//! once to the broker's [`FallbackSink`], prefixed with the component it
//! belongs to. The stock sink writes to stderr; [`MemoryFallback`] captures
//! reports for tests.

use parking_lot::Mutex;
use std::fmt::Debug;
use std::io::Write as _;

pub trait FallbackSink: Debug + Send + Sync {
    /// Reports an internally caught failure on behalf of `component`
    /// (a backend key, or `dispatch` for the broker's own worker).
    fn report(&self, component: &str, message: &str);
}

/// The stock fallback sink: one line per report on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrFallback;

impl StderrFallback {
    pub const fn new() -> Self {
        Self
    }
}

impl FallbackSink for StderrFallback {
    fn report(&self, component: &str, message: &str) {
        // If stderr itself is gone there is nowhere left to report to.
        let mut lock = std::io::stderr().lock();
        let _ = writeln!(lock, "logfan [{component}] {message}");
    }
}

/// A fallback sink that captures reports in memory, for tests.
#[derive(Debug, Default)]
pub struct MemoryFallback {
    reports: Mutex<Vec<String>>,
}

impl MemoryFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all reports captured so far and clears the buffer.
    ///
    /// Each entry has the form `"{component} - {message}"`.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.reports.lock())
    }
}

impl FallbackSink for MemoryFallback {
    fn report(&self, component: &str, message: &str) {
        self.reports.lock().push(format!("{component} - {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fallback_captures_and_drains() {
        let sink = MemoryFallback::new();
        sink.report("file1", "disabled");
        sink.report("dispatch", "no backend registered under key 'ghost'");

        let reports = sink.drain();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], "file1 - disabled");
        assert!(reports[1].starts_with("dispatch - "));
        assert!(sink.drain().is_empty(), "drain should clear the buffer");
    }
}
