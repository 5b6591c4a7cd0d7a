// SPDX-License-Identifier: MIT OR Apache-2.0

//! The convenience front-end: a tag-carrying handle over a broker.
//!
//! A [`Logger`] is what application code actually holds. It pins a tag,
//! applies a caller-side minimum level before anything is allocated or
//! enqueued, and forwards to [`Broker::log`]. Message formatting is the
//! caller's `format!`; by the time a string reaches the pipeline it is final.

use crate::{Broker, EventError, Level};
use std::sync::Arc;

/**
A tagged logging handle.

```
use logfan::{Broker, Level};
use std::sync::Arc;

let broker = Arc::new(Broker::new());
let log = broker.logger("Connectivity");
log.info("link established");
log.warning(format!("latency above {}ms", 250));
broker.shutdown();
```
*/
#[derive(Debug, Clone)]
pub struct Logger {
    broker: Arc<Broker>,
    tag: Arc<str>,
    min_level: Level,
}

impl Logger {
    pub fn new(broker: Arc<Broker>, tag: impl Into<Arc<str>>) -> Self {
        Self {
            broker,
            tag: tag.into(),
            min_level: Level::Verbose,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Suppresses everything below `level` at the call site, before the
    /// broker's own pre-filter runs.
    pub fn set_min_level(&mut self, level: Level) {
        self.min_level = level;
    }

    fn can_log(&self, level: Level) -> bool {
        level >= self.min_level
    }

    pub fn log(&self, level: Level, message: impl Into<Arc<str>>) {
        if !self.can_log(level) {
            return;
        }
        self.broker.log(level, self.tag.clone(), message, None);
    }

    /// Logs `message` with an attached error; the composer renders the
    /// error's source chain after the message line.
    pub fn log_err(
        &self,
        level: Level,
        message: impl Into<Arc<str>>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) {
        if !self.can_log(level) {
            return;
        }
        let error: EventError = Arc::new(error);
        self.broker.log(level, self.tag.clone(), message, Some(error));
    }

    pub fn verbose(&self, message: impl Into<Arc<str>>) {
        self.log(Level::Verbose, message);
    }

    pub fn debug(&self, message: impl Into<Arc<str>>) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Into<Arc<str>>) {
        self.log(Level::Info, message);
    }

    pub fn warning(&self, message: impl Into<Arc<str>>) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: impl Into<Arc<str>>) {
        self.log(Level::Error, message);
    }

    /// What a Terrible Failure: logs at [`Level::Assert`].
    pub fn wtf(&self, message: impl Into<Arc<str>>) {
        self.log(Level::Assert, message);
    }
}

impl Broker {
    /// A [`Logger`] handle over this broker, pinned to `tag`.
    pub fn logger(self: &Arc<Self>, tag: impl Into<Arc<str>>) -> Logger {
        Logger::new(self.clone(), tag)
    }
}

/*
Boilerplate notes.

# Logger

Clone is cheap and right: handles are meant to be scattered through the
application, and cloning shares the broker and the tag. PartialEq et al are
not meaningful for handles. Default can't exist without a broker.
*/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Backend, LevelWindow, MemoryBackend, RoutingRule};

    #[test]
    fn min_level_gates_before_the_broker() {
        let broker = Arc::new(Broker::new());
        let captured = Arc::new(MemoryBackend::new("memory"));
        broker
            .install(
                vec![RoutingRule::new(LevelWindow::all(), vec!["memory".into()])],
                vec![captured.clone() as Arc<dyn Backend>],
            )
            .expect("install");

        let mut log = broker.logger("Gate");
        log.set_min_level(Level::Warning);
        log.info("suppressed at the handle");
        log.error("delivered");
        broker.shutdown();

        let lines = captured.drain();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("delivered"));
        assert!(lines[0].contains("Gate"));
    }

    #[test]
    fn log_err_attaches_the_error_chain() {
        let broker = Arc::new(Broker::new());
        let captured = Arc::new(MemoryBackend::new("memory"));
        broker
            .install(
                vec![RoutingRule::new(LevelWindow::all(), vec!["memory".into()])],
                vec![captured.clone() as Arc<dyn Backend>],
            )
            .expect("install");

        let log = broker.logger("Io");
        log.log_err(
            Level::Error,
            "read failed",
            std::io::Error::other("device unplugged"),
        );
        broker.shutdown();

        let lines = captured.drain();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("read failed"));
        assert!(lines[0].contains("device unplugged"));
    }
}
