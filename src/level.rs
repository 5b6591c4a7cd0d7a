// SPDX-License-Identifier: MIT OR Apache-2.0
use serde::{Deserialize, Serialize};

/// Severity of a log event.
///
/// The derived ordering is the routing ordering: `Verbose < Debug < Info < Warning < Error < Assert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Chatty output, only interesting while watching one component closely
    Verbose,
    /// Print-style debugging
    Debug,
    /// Normal operational messages
    Info,
    /// Suspicious condition
    Warning,
    /// Runtime error
    Error,
    /// Programmer error; the process may be about to die
    Assert,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Assert => "Assert",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
An inclusive `[min, max]` severity range.

Windows appear at three independent points of the pipeline: the broker's global
pre-filter, every routing rule, and every backend. An event must pass each of
them to reach a sink; passing one implies nothing about the others.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelWindow {
    pub min: Level,
    pub max: Level,
}

impl LevelWindow {
    pub const fn new(min: Level, max: Level) -> Self {
        Self { min, max }
    }

    /// The widest window, `Verbose..=Assert`.
    pub const fn all() -> Self {
        Self::new(Level::Verbose, Level::Assert)
    }

    pub fn contains(self, level: Level) -> bool {
        self.min <= level && level <= self.max
    }
}

impl Default for LevelWindow {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_ascending() {
        assert!(Level::Verbose < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Assert);
    }

    #[test]
    fn window_is_inclusive_at_both_ends() {
        let window = LevelWindow::new(Level::Info, Level::Error);
        assert!(!window.contains(Level::Debug));
        assert!(window.contains(Level::Info));
        assert!(window.contains(Level::Warning));
        assert!(window.contains(Level::Error));
        assert!(!window.contains(Level::Assert));
    }

    #[test]
    fn default_window_admits_everything() {
        let window = LevelWindow::default();
        assert!(window.contains(Level::Verbose));
        assert!(window.contains(Level::Assert));
    }
}
