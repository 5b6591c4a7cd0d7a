// SPDX-License-Identifier: MIT OR Apache-2.0

//! Textual rendering of log events.
//!
//! A [`Composer`] is a pure function from event to text. Backends own one and
//! invoke it on their own worker thread (or inline, for synchronous backends),
//! so implementations must be `Send + Sync` and should use per-call buffers
//! rather than a shared one.

use crate::LogEvent;
use std::fmt::Debug;
use std::fmt::Write as _;

pub trait Composer: Debug + Send + Sync {
    /**
    Renders the event to the text a backend will persist.

    The returned string is expected to be newline-terminated; the file backend
    counts its UTF-8 byte length against the rotation cursor verbatim.
    */
    fn compose(&self, event: &LogEvent) -> String;
}

/**
The stock rendering: `timestamp level/thread/tag: message`, followed by the
error's source chain when one is attached.

```text
2024-01-02 03:04:05.678+0000 Info/main/Connectivity: link established
```
*/
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DefaultComposer;

impl DefaultComposer {
    pub const fn new() -> Self {
        Self
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f%z";

impl Composer for DefaultComposer {
    fn compose(&self, event: &LogEvent) -> String {
        let mut out = String::with_capacity(64 + event.message().len());
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{} {}/{}/{}: {}",
            event.timestamp().format(TIME_FORMAT),
            event.level(),
            event.thread(),
            event.tag(),
            event.message(),
        );
        if let Some(error) = event.error() {
            let _ = writeln!(out, "{error}");
            let mut source = error.source();
            while let Some(cause) = source {
                let _ = writeln!(out, "caused by: {cause}");
                source = cause.source();
            }
        }
        out
    }
}

/*
Boilerplate notes for DefaultComposer:

Copy/PartialEq/Eq/Hash/Default are all fine for a zero-sized struct.
Display makes no sense; the composer produces strings, it isn't one.
Send/Sync are automatic and required by the trait.
*/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use chrono::DateTime;
    use std::sync::Arc;

    fn event_at(secs: i64, millis: u32, error: Option<crate::EventError>) -> LogEvent {
        let timestamp = DateTime::from_timestamp(secs, millis * 1_000_000).expect("valid timestamp");
        LogEvent::new(
            timestamp,
            Level::Info,
            Arc::from("main"),
            Arc::from("Core"),
            Arc::from("hello"),
            error,
        )
    }

    #[test]
    fn renders_timestamp_level_thread_tag_message() {
        // 2024-01-02 03:04:05 UTC
        let composed = DefaultComposer.compose(&event_at(1_704_164_645, 678, None));
        assert_eq!(composed, "2024-01-02 03:04:05.678+0000 Info/main/Core: hello\n");
    }

    #[test]
    fn renders_error_source_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "outer failed")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let error: crate::EventError = Arc::new(Outer(std::io::Error::other("inner failed")));
        let composed = DefaultComposer.compose(&event_at(1_704_164_645, 0, Some(error)));
        let mut lines = composed.lines();
        assert_eq!(
            lines.next(),
            Some("2024-01-02 03:04:05.000+0000 Info/main/Core: hello")
        );
        assert_eq!(lines.next(), Some("outer failed"));
        assert_eq!(lines.next(), Some("caused by: inner failed"));
        assert_eq!(lines.next(), None);
    }
}
