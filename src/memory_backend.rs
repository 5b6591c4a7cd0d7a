// SPDX-License-Identifier: MIT OR Apache-2.0

//! # In-Memory Backend
//!
//! Captures composed events in memory instead of persisting them, which makes
//! it the workhorse for tests and a practical escape hatch in environments
//! where neither a console nor a writable filesystem is available.
//!
//! Delivery is synchronous: by the time the dispatch worker has forwarded an
//! event, the line is in the buffer. Tests that drain the broker first (via
//! [`Broker::shutdown`](crate::Broker::shutdown)) therefore observe every
//! delivered event with no sleeps or polling.

use crate::composer::{Composer, DefaultComposer};
use crate::{Backend, LevelWindow, LogEvent, MemoryConfig};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// A backend that stores composed lines in a `Vec<String>`.
///
/// # Example
///
/// ```
/// use logfan::{Backend, Broker, Level, LevelWindow, MemoryBackend, RoutingRule};
/// use std::sync::Arc;
///
/// let broker = Arc::new(Broker::new());
/// let captured = Arc::new(MemoryBackend::new("memory"));
/// broker
///     .install(
///         vec![RoutingRule::new(LevelWindow::all(), vec!["memory".into()])],
///         vec![captured.clone() as Arc<dyn Backend>],
///     )
///     .expect("unique keys");
///
/// broker.log(Level::Info, "Example", "hello", None);
/// broker.shutdown();
///
/// let lines = captured.drain();
/// assert_eq!(lines.len(), 1);
/// assert!(lines[0].contains("hello"));
/// ```
#[derive(Debug)]
pub struct MemoryBackend {
    key: String,
    window: RwLock<LevelWindow>,
    composer: Arc<dyn Composer>,
    lines: Mutex<Vec<String>>,
}

impl MemoryBackend {
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_composer(key, Arc::new(DefaultComposer::new()))
    }

    pub fn with_composer(key: impl Into<String>, composer: Arc<dyn Composer>) -> Self {
        Self {
            key: key.into(),
            window: RwLock::new(LevelWindow::all()),
            composer,
            lines: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn from_config(config: &MemoryConfig) -> Self {
        let backend = Self::new(config.key.clone());
        backend.set_window(config.window);
        backend
    }

    /// Returns every composed entry captured so far and clears the buffer.
    ///
    /// One entry per delivered event; an entry may span multiple lines when
    /// the event carried an error chain.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl Backend for MemoryBackend {
    fn key(&self) -> &str {
        &self.key
    }

    fn init(&self) {
        // Memory needs no acquiring.
    }

    fn window(&self) -> LevelWindow {
        *self.window.read()
    }

    fn set_window(&self, window: LevelWindow) {
        *self.window.write() = window;
    }

    fn deliver(&self, event: &LogEvent) {
        let text = self.composer.compose(event);
        self.lines.lock().push(text);
    }

    fn dispose(&self) {
        // Captured lines stay readable after dispose; tests drain last.
    }
}
