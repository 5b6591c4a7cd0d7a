// SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# logfan

logfan is a rule-driven log distribution broker for Rust.

# Development status

logfan is experimental and the API may change.

# The problem

Typical logging crates give you one pipeline: a record is created, filtered by
level, and handed to *the* subscriber. That model gets awkward the moment
different consumers want different slices of the stream:

* Ship `Warning` and above to a rotated file set, but keep full `Verbose`
  output on the console while debugging.
* Route everything produced by the `worker-*` threads to their own file,
  without touching what the rest of the process logs.
* Capture one chatty subsystem (by tag) into a buffer a bug report can
  attach, at no cost to every other log call.

These are *routing* decisions, and they change at runtime. logfan makes them
data: a list of declarative rules (level range, thread-name pattern, tag
pattern, target backends) evaluated in order against every event, installed
and replaced atomically as one configuration generation.

# The pipeline

Producers never wait for I/O. A `log` call captures the timestamp and the
calling thread's name, then enqueues; a dispatch worker evaluates the rules
and fans each event out to the matching backends; every asynchronous backend
(the rotating file backend, for one) queues again and writes on its own
worker thread. A slow disk stalls one backend's worker and nothing else.

Failures inside the pipeline never reach producers. Configuration problems
fail fast in [`Broker::configure`]; everything after that (unresolved target
keys, a panicking backend, an I/O error during rotation) is reported to the
[fallback sink](FallbackSink) and contained: a file backend that cannot write
disables itself and the rest of the pipeline keeps flowing.

# Example

```
use logfan::{Broker, Level, LevelWindow, MemoryBackend, RoutingRule, Backend};
use std::sync::Arc;

let broker = Arc::new(Broker::new());
let errors = Arc::new(MemoryBackend::new("errors"));
broker.install(
    vec![
        RoutingRule::new(
            LevelWindow::new(Level::Warning, Level::Assert),
            vec!["errors".into()],
        ),
    ],
    vec![errors.clone() as Arc<dyn Backend>],
).expect("keys are unique");

let log = broker.logger("Payments");
log.info("card accepted");          // matches no rule
log.error("settlement failed");     // routed to "errors"
broker.shutdown();

assert_eq!(errors.drain().len(), 1);
```

The same topology can come from data instead of code: see [`BrokerConfig`]
for the serde surface, including `${var}` placeholder substitution.

# Backends

[`ConsoleBackend`] (stdout/stderr split by level), [`FileBackend`]
(size-rotated, zip-archived file set), and [`MemoryBackend`] (capture for
tests) ship in the crate; anything else can implement [`Backend`] and be
handed to [`Broker::install`].
*/

mod backend;
mod broker;
mod composer;
mod config;
mod console_backend;
mod fallback;
mod file_backend;
mod level;
mod log_event;
mod logger;
mod memory_backend;
mod rule;

pub use backend::Backend;
pub use broker::Broker;
pub use composer::{Composer, DefaultComposer};
pub use config::{
    BackendConfig, BrokerConfig, ConfigError, ConsoleConfig, FileConfig, MemoryConfig, RuleConfig,
};
pub use console_backend::ConsoleBackend;
pub use fallback::{FallbackSink, MemoryFallback, StderrFallback};
pub use file_backend::FileBackend;
pub use level::{Level, LevelWindow};
pub use log_event::{EventError, LogEvent};
pub use logger::Logger;
pub use memory_backend::MemoryBackend;
pub use rule::RoutingRule;
