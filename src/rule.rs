// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing rules: which events reach which backends.
//!
//! A rule is a predicate over an event (level range, optional thread-name
//! pattern, optional tag pattern) plus the ordered list of backend keys it
//! fans out to. Rules are immutable once installed; reconfiguration replaces
//! the whole list atomically.

use crate::{LevelWindow, LogEvent};
use regex::{Regex, RegexBuilder};

/**
A declarative routing predicate and its fan-out targets.

Patterns are full-match and case-insensitive: a thread pattern `worker-\d+`
matches the thread `Worker-12` and does not match `my-worker-12`. An absent
pattern matches everything.
*/
#[derive(Debug, Clone)]
pub struct RoutingRule {
    window: LevelWindow,
    thread_pattern: Option<Regex>,
    tag_pattern: Option<Regex>,
    targets: Vec<String>,
}

impl RoutingRule {
    /// A rule admitting `window` with no thread or tag constraint.
    pub fn new(window: LevelWindow, targets: Vec<String>) -> Self {
        Self {
            window,
            thread_pattern: None,
            tag_pattern: None,
            targets,
        }
    }

    /// Constrains the rule to threads whose name fully matches `pattern`
    /// (case-insensitive).
    pub fn thread_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.thread_pattern = Some(compile_full_match(pattern)?);
        Ok(self)
    }

    /// Constrains the rule to tags fully matching `pattern` (case-insensitive).
    pub fn tag_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.tag_pattern = Some(compile_full_match(pattern)?);
        Ok(self)
    }

    pub fn window(&self) -> LevelWindow {
        self.window
    }

    /// The backend keys this rule forwards to, in declaration order.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Tests the event against all three predicates, cheapest first.
    pub fn matches(&self, event: &LogEvent) -> bool {
        if !self.window.contains(event.level()) {
            return false;
        }
        if let Some(pattern) = &self.thread_pattern {
            if !pattern.is_match(event.thread()) {
                return false;
            }
        }
        if let Some(pattern) = &self.tag_pattern {
            if !pattern.is_match(event.tag()) {
                return false;
            }
        }
        true
    }
}

/// Anchors `pattern` so `is_match` becomes a full-string match.
fn compile_full_match(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use chrono::Utc;
    use std::sync::Arc;

    fn event(level: Level, thread: &str, tag: &str) -> LogEvent {
        LogEvent::new(
            Utc::now(),
            level,
            Arc::from(thread),
            Arc::from(tag),
            Arc::from("message"),
            None,
        )
    }

    #[test]
    fn absent_patterns_are_wildcards() {
        let rule = RoutingRule::new(LevelWindow::all(), vec!["file1".into()]);
        assert!(rule.matches(&event(Level::Verbose, "anything", "AnyTag")));
    }

    #[test]
    fn level_outside_window_never_matches() {
        let rule = RoutingRule::new(
            LevelWindow::new(Level::Warning, Level::Assert),
            vec!["file1".into()],
        );
        assert!(!rule.matches(&event(Level::Info, "main", "Core")));
        assert!(rule.matches(&event(Level::Error, "main", "Core")));
    }

    #[test]
    fn thread_pattern_is_case_insensitive_full_match() {
        let rule = RoutingRule::new(LevelWindow::all(), vec!["file1".into()])
            .thread_pattern(r"worker-\d+")
            .expect("valid pattern");
        assert!(rule.matches(&event(Level::Info, "Worker-12", "Core")));
        assert!(!rule.matches(&event(Level::Info, "my-worker-12", "Core")));
        assert!(!rule.matches(&event(Level::Info, "worker-12-extra", "Core")));
    }

    #[test]
    fn tag_pattern_is_case_insensitive_full_match() {
        let rule = RoutingRule::new(LevelWindow::all(), vec!["file1".into()])
            .tag_pattern("net.*")
            .expect("valid pattern");
        assert!(rule.matches(&event(Level::Info, "main", "Network")));
        assert!(rule.matches(&event(Level::Info, "main", "NET")));
        assert!(!rule.matches(&event(Level::Info, "main", "Subnet")));
    }

    #[test]
    fn all_predicates_must_pass() {
        let rule = RoutingRule::new(
            LevelWindow::new(Level::Error, Level::Assert),
            vec!["file1".into()],
        )
        .tag_pattern("core")
        .expect("valid pattern");
        assert!(rule.matches(&event(Level::Error, "main", "Core")));
        assert!(!rule.matches(&event(Level::Info, "main", "Core")));
        assert!(!rule.matches(&event(Level::Error, "main", "Other")));
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let result = RoutingRule::new(LevelWindow::all(), vec![]).tag_pattern("(unclosed");
        assert!(result.is_err());
    }
}
