// SPDX-License-Identifier: MIT OR Apache-2.0

//! The broker: registry, rule set, and the dispatch pipeline.
//!
//! A [`Broker`] is an explicit, caller-constructed context object. The
//! expected deployment is one broker per process, owned near `main` and
//! handed to producers as an `Arc`, but nothing here is process-global and
//! tests routinely run several side by side.
//!
//! # Generations
//!
//! The rule list and the backend registry always change together, as one
//! *generation* swapped atomically ([`arc_swap`]). `log` and the dispatch
//! worker only ever observe a complete generation, old or new, never a
//! partially updated one. The outgoing generation's backends are disposed
//! after the new one is installed; events already queued against an outgoing
//! backend drain into it, which is the deliberate trade: a brief overlap, a
//! brief gap, never a crash.
//!
//! # Dispatch
//!
//! One worker thread consumes the broker queue in FIFO order and evaluates
//! every rule, in declaration order, against each event. A rule's targets are
//! resolved against the current registry; an unresolved key is reported to
//! the fallback sink and skipped. A panic escaping a backend's forward call
//! is caught, reported together with the event's rendering, and dispatch
//! moves on: one poisoned backend must not halt the pipeline.

use crate::config::compile_rules;
use crate::console_backend::ConsoleBackend;
use crate::fallback::{FallbackSink, StderrFallback};
use crate::file_backend::FileBackend;
use crate::memory_backend::MemoryBackend;
use crate::{
    Backend, BackendConfig, BrokerConfig, ConfigError, EventError, Level, LevelWindow, LogEvent,
    RoutingRule,
};
use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

#[derive(Debug, Default)]
struct Generation {
    rules: Vec<RoutingRule>,
    backends: HashMap<String, Arc<dyn Backend>>,
}

enum Message {
    Event(LogEvent),
    Quit,
}

#[derive(Debug)]
struct Shared {
    generation: ArcSwap<Generation>,
    window: RwLock<LevelWindow>,
    fallback: Arc<dyn FallbackSink>,
}

/**
The log distribution broker.

Producers call [`log`](Broker::log), which never blocks and never fails
visibly: the only fallible operations are [`configure`](Broker::configure)
and [`install`](Broker::install).

A freshly constructed broker has no rules and no backends; events are
accepted and drain away. That state is explicitly legal, not an error, and
so is a configuration with zero rules.
*/
#[derive(Debug)]
pub struct Broker {
    shared: Arc<Shared>,
    tx: flume::Sender<Message>,
    alive: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    reconfigure: Mutex<()>,
}

impl Broker {
    /// A broker reporting internal failures to stderr.
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(StderrFallback::new()))
    }

    /// A broker reporting internal failures to `fallback` instead of stderr.
    pub fn with_fallback(fallback: Arc<dyn FallbackSink>) -> Self {
        let shared = Arc::new(Shared {
            generation: ArcSwap::from_pointee(Generation::default()),
            window: RwLock::new(LevelWindow::all()),
            fallback,
        });
        let (tx, rx) = flume::unbounded();
        let worker_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("logfan-dispatch".into())
            .spawn(move || dispatch_loop(rx, worker_shared))
            .expect("spawn dispatch thread");
        Self {
            shared,
            tx,
            alive: AtomicBool::new(true),
            worker: Mutex::new(Some(handle)),
            reconfigure: Mutex::new(()),
        }
    }

    /**
    Validates `config`, builds and initializes its backends, then installs
    the new generation and disposes the previous one.

    Validation (duplicate keys, per-backend field checks, rule pattern
    compilation) completes before any backend is constructed or started; on
    error the broker keeps running on its previous generation.
    */
    pub fn configure(&self, config: BrokerConfig) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for backend in &config.backends {
            if !seen.insert(backend.key().to_string()) {
                return Err(ConfigError::DuplicateKey(backend.key().to_string()));
            }
        }
        for backend in &config.backends {
            backend.validate()?;
        }
        let rules = compile_rules(&config.rules)?;

        let backends = config
            .backends
            .iter()
            .map(|backend| self.build(backend))
            .collect();
        self.install(rules, backends)
    }

    fn build(&self, config: &BackendConfig) -> Arc<dyn Backend> {
        match config {
            BackendConfig::Console(config) => Arc::new(ConsoleBackend::from_config(config)),
            BackendConfig::File(config) => Arc::new(FileBackend::from_config(
                config,
                self.shared.fallback.clone(),
            )),
            BackendConfig::Memory(config) => Arc::new(MemoryBackend::from_config(config)),
        }
    }

    /**
    Installs already-constructed backends and compiled rules as the next
    generation.

    This is the typed entry [`configure`](Broker::configure) feeds after
    building; it is public so tests and applications with their own
    [`Backend`] implementations can bypass the config layer. Each backend's
    `init` runs before the generation becomes visible to dispatch, and the
    previous generation is disposed afterwards.
    */
    pub fn install(
        &self,
        rules: Vec<RoutingRule>,
        backends: Vec<Arc<dyn Backend>>,
    ) -> Result<(), ConfigError> {
        let _guard = self.reconfigure.lock();

        let mut registry: HashMap<String, Arc<dyn Backend>> = HashMap::new();
        for backend in backends {
            let key = backend.key().to_string();
            if registry.insert(key.clone(), backend).is_some() {
                return Err(ConfigError::DuplicateKey(key));
            }
        }

        // After shutdown there is no worker left to ever dispose a new
        // generation; refuse quietly rather than leak backend workers.
        if !self.alive.load(Ordering::Acquire) {
            return Ok(());
        }

        for backend in registry.values() {
            backend.init();
        }
        let next = Arc::new(Generation {
            rules,
            backends: registry,
        });
        let previous = self.shared.generation.swap(next);
        for backend in previous.backends.values() {
            backend.dispose();
        }
        Ok(())
    }

    /**
    Emits one event into the pipeline.

    Applies the broker's global level window first; a rejected event
    allocates nothing. Otherwise the wall-clock timestamp and calling
    thread's name are captured and the event is enqueued for the dispatch
    worker. Never blocks, never returns an error.
    */
    pub fn log(
        &self,
        level: Level,
        tag: impl Into<Arc<str>>,
        message: impl Into<Arc<str>>,
        error: Option<EventError>,
    ) {
        if !self.shared.window.read().contains(level) {
            return;
        }
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        let event = LogEvent::capture(level, tag.into(), message.into(), error);
        let _ = self.tx.send(Message::Event(event));
    }

    /// The broker's global pre-filter window.
    pub fn window(&self) -> LevelWindow {
        *self.shared.window.read()
    }

    pub fn set_window(&self, window: LevelWindow) {
        *self.shared.window.write() = window;
    }

    /// A snapshot of the current registry, for introspection and tests.
    pub fn backends(&self) -> HashMap<String, Arc<dyn Backend>> {
        self.shared.generation.load().backends.clone()
    }

    /**
    Drains the dispatch queue, then disposes every backend (each of which
    drains its own queue). Idempotent; also runs on drop.

    Events logged after shutdown are discarded.
    */
    pub fn shutdown(&self) {
        let mut worker = self.worker.lock();
        let Some(handle) = worker.take() else {
            return;
        };
        self.alive.store(false, Ordering::Release);
        let _ = self.tx.send(Message::Quit);
        let _ = handle.join();

        let _guard = self.reconfigure.lock();
        let previous = self.shared.generation.swap(Arc::new(Generation::default()));
        for backend in previous.backends.values() {
            backend.dispose();
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch_loop(rx: flume::Receiver<Message>, shared: Arc<Shared>) {
    for message in rx.iter() {
        let event = match message {
            Message::Event(event) => event,
            Message::Quit => break,
        };
        let generation = shared.generation.load();
        for rule in &generation.rules {
            if !rule.matches(&event) {
                continue;
            }
            for key in rule.targets() {
                let Some(backend) = generation.backends.get(key) else {
                    shared
                        .fallback
                        .report("dispatch", &format!("no backend registered under key '{key}'"));
                    continue;
                };
                let forward = panic::catch_unwind(AssertUnwindSafe(|| backend.log(&event)));
                if let Err(payload) = forward {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    shared.fallback.report(
                        backend.key(),
                        &format!("panicked while logging ({reason}); event: {event}"),
                    );
                }
            }
        }
    }
}

/*
Boilerplate notes.

# Broker

Clone is wrong; the broker owns the dispatch worker and there must be one
owner deciding when to shut it down (share an Arc<Broker> instead).
PartialEq/Eq/Hash/Ord make no sense for a pipeline. Default delegates to
new() since an unconfigured broker is a legal, useful value. Display, no.
Send/Sync hold: every field is a thread-safe handle, which is the point.
*/
