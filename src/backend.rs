// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::{LevelWindow, LogEvent};
use std::fmt::Debug;

/**
A pluggable sink for log events.

The broker talks to every backend through exactly this surface: [`init`](Backend::init)
before the backend is installed into a registry generation, [`log`](Backend::log)
for each forwarded event, and [`dispose`](Backend::dispose) when the generation
is replaced or the broker shuts down.

Implementations own their level window, their composer, and their delivery
path. An asynchronous backend enqueues a clone of the event onto its own queue
inside [`deliver`](Backend::deliver) and must never block the caller.
*/
pub trait Backend: Debug + Send + Sync {
    /// The registry key this backend is addressed by in routing rules.
    fn key(&self) -> &str;

    /**
    Acquires resources (file handles, worker threads) ahead of the first event.

    Called once, before the backend is installed. Failures are not raised:
    a backend that cannot acquire its resources disables itself and reports
    the cause to the fallback sink, exactly as it would for a runtime I/O
    failure. Calling `init` again on an already started backend is a no-op.
    */
    fn init(&self);

    /// This backend's own level window, applied independently of any rule's.
    fn window(&self) -> LevelWindow;

    fn set_window(&self, window: LevelWindow);

    /**
    Unfiltered sink entry: render and persist (or enqueue) the event.

    Callers are expected to go through [`log`](Backend::log) instead, which
    applies the level window first.
    */
    fn deliver(&self, event: &LogEvent);

    /**
    Stops accepting events, drains anything already queued, and releases
    resources. Idempotent.
    */
    fn dispose(&self);

    /// Window-filtered entry used by the dispatch worker.
    fn log(&self, event: &LogEvent) {
        if self.window().contains(event.level()) {
            self.deliver(event);
        }
    }
}

/*
Boilerplate notes.

# Backend

Clone makes no sense; a backend owns unique resources (file handles, worker
threads). PartialEq/Eq would have to choose between data and provenance
equality, so neither. Ord, no. Hash, same ambiguity as Eq. Default is not
sensible since construction needs a key and usually a config. Display is
covered well enough by Debug. Send + Sync are required: registries are shared
between the dispatch worker and whoever calls configure.
*/
