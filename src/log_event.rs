// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log event type for the logfan pipeline.
//!
//! This module defines [`LogEvent`], the immutable value that travels from the
//! producer through the broker's dispatch queue and into each matching
//! backend's delivery queue.
//!
//! # Design Philosophy
//!
//! Every queue hop clones the event, so the event must be cheap to clone. The
//! string payloads (thread name, tag, message) are `Arc<str>` and the optional
//! error is `Arc`-wrapped, which makes a clone a handful of reference-count
//! bumps. No queue ever holds a *borrowed* event, so there is no window in
//! which a backend can observe an event being reused or mutated.

use crate::Level;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::sync::Arc;

/// The error payload of a [`LogEvent`].
///
/// `Arc`-wrapped so that an event carrying an error stays cheap to clone into
/// per-backend queues.
pub type EventError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/**
A single log event.

Constructed at the moment the producer calls into the broker, which is when the
wall-clock timestamp and the calling thread's name are captured. After
construction the event is immutable; backends only ever see `&LogEvent` or
their own clone of it.
*/
#[derive(Debug, Clone)]
pub struct LogEvent {
    timestamp: DateTime<Utc>,
    level: Level,
    thread: Arc<str>,
    tag: Arc<str>,
    message: Arc<str>,
    error: Option<EventError>,
}

impl LogEvent {
    /// Full constructor with an explicit timestamp and thread name.
    pub fn new(
        timestamp: DateTime<Utc>,
        level: Level,
        thread: Arc<str>,
        tag: Arc<str>,
        message: Arc<str>,
        error: Option<EventError>,
    ) -> Self {
        Self {
            timestamp,
            level,
            thread,
            tag,
            message,
            error,
        }
    }

    /// Builds an event stamped with the current wall-clock time and the name
    /// of the calling thread.
    ///
    /// Threads without a name are recorded as `unnamed`.
    pub fn capture(level: Level, tag: Arc<str>, message: Arc<str>, error: Option<EventError>) -> Self {
        let thread = std::thread::current()
            .name()
            .map(Arc::from)
            .unwrap_or_else(|| Arc::from("unnamed"));
        Self::new(Utc::now(), level, thread, tag, message, error)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn thread(&self) -> &str {
        &self.thread
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.error.as_deref()
    }
}

impl Display for LogEvent {
    /// Timestamp-free rendering used by the fallback sink when it needs to
    /// describe the event a failure was observed on.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}: {}",
            self.level, self.thread, self.tag, self.message
        )
    }
}

/*
Boilerplate notes for LogEvent:

IMPLEMENTED:
- Debug: Derived - essential for diagnostics
- Clone: Derived - the whole point; every queue hop clones
- Display: Implemented - compact rendering for fallback reporting

NOT IMPLEMENTED:
- PartialEq/Eq/Hash: the error payload is a trait object with no equality
- Copy: Arc payloads
- Default: an event without a capture moment is not a meaningful value
- Ord/PartialOrd: timestamp ordering would be a trap; queues are FIFO, not sorted

AUTOMATIC:
- Send/Sync: all payloads are Arc over Send + Sync data
*/

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_records_thread_name() {
        let handle = std::thread::Builder::new()
            .name("capture-test".into())
            .spawn(|| {
                LogEvent::capture(Level::Info, Arc::from("Tag"), Arc::from("message"), None)
            })
            .expect("spawn thread");
        let event = handle.join().expect("join thread");
        assert_eq!(event.thread(), "capture-test");
        assert_eq!(event.level(), Level::Info);
        assert_eq!(event.tag(), "Tag");
        assert_eq!(event.message(), "message");
        assert!(event.error().is_none());
    }

    #[test]
    fn display_omits_timestamp() {
        let event = LogEvent::new(
            Utc::now(),
            Level::Warning,
            Arc::from("main"),
            Arc::from("Core"),
            Arc::from("something odd"),
            None,
        );
        assert_eq!(event.to_string(), "Warning/main/Core: something odd");
    }
}
