// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::composer::{Composer, DefaultComposer};
use crate::{Backend, LevelWindow, LogEvent};
use crate::{ConsoleConfig, Level};
use parking_lot::RwLock;
use std::io::Write as _;
use std::sync::Arc;

/**
A backend that writes composed events to the process console.

Verbose, Debug and Info go to stdout; Warning, Error and Assert go to stderr.
Delivery is synchronous: composing and writing a console line is cheap enough
that a dedicated worker would only add reordering relative to the process's
own prints. Write errors are swallowed; a console that is gone has no better
channel to complain on.
*/
#[derive(Debug)]
pub struct ConsoleBackend {
    key: String,
    window: RwLock<LevelWindow>,
    composer: Arc<dyn Composer>,
}

impl ConsoleBackend {
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_composer(key, Arc::new(DefaultComposer::new()))
    }

    pub fn with_composer(key: impl Into<String>, composer: Arc<dyn Composer>) -> Self {
        Self {
            key: key.into(),
            window: RwLock::new(LevelWindow::all()),
            composer,
        }
    }

    pub(crate) fn from_config(config: &ConsoleConfig) -> Self {
        let backend = Self::new(config.key.clone());
        backend.set_window(config.window);
        backend
    }
}

impl Backend for ConsoleBackend {
    fn key(&self) -> &str {
        &self.key
    }

    fn init(&self) {
        // The console is already open.
    }

    fn window(&self) -> LevelWindow {
        *self.window.read()
    }

    fn set_window(&self, window: LevelWindow) {
        *self.window.write() = window;
    }

    fn deliver(&self, event: &LogEvent) {
        let text = self.composer.compose(event);
        match event.level() {
            Level::Verbose | Level::Debug | Level::Info => {
                let mut lock = std::io::stdout().lock();
                let _ = lock.write_all(text.as_bytes());
            }
            Level::Warning | Level::Error | Level::Assert => {
                let mut lock = std::io::stderr().lock();
                let _ = lock.write_all(text.as_bytes());
            }
        }
    }

    fn dispose(&self) {
        // Unbuffered; nothing to drain or release.
    }
}
