// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The captured-failure-context value object.
//!
//! A [`CrashContext`] is assembled at the catch boundary from whatever the
//! failure left behind: a panic payload plus hook snapshot, or an error value
//! surfaced through `Result`. It carries everything the renderer needs and
//! nothing tied to unwinding, so it can be built, passed, and stored like any
//! other value.

use std::fmt;

use chrono::{DateTime, Utc};

/// How the monitored work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The work panicked.
    Panic,
    /// The work returned an error.
    Error,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Panic => write!(f, "panic"),
            FailureKind::Error => write!(f, "error"),
        }
    }
}

/// Source position of a panic, as reported by the panic hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Everything captured about one failure.
#[derive(Debug, Clone)]
pub struct CrashContext {
    pub kind: FailureKind,
    pub message: String,
    /// Where the panic fired. Errors carry no source position.
    pub location: Option<SourceLocation>,
    /// Stack backtrace, captured at the panic site when the hook is
    /// installed, otherwise at the catch boundary.
    pub backtrace: Option<String>,
    /// Name of the thread the failure happened on.
    pub thread: Option<String>,
    /// Host-attached key/value annotations, rendered as a table.
    pub values: Vec<(String, String)>,
    pub captured_at: DateTime<Utc>,
}

impl CrashContext {
    /// Builds a context for an error value surfaced through `Result`.
    ///
    /// Captures a backtrace at the call site; with errors there is no
    /// panic hook snapshot to consume.
    pub fn from_error(err: &dyn fmt::Display) -> Self {
        Self {
            kind: FailureKind::Error,
            message: err.to_string(),
            location: None,
            backtrace: Some(std::backtrace::Backtrace::force_capture().to_string()),
            thread: std::thread::current().name().map(str::to_string),
            values: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    /// Builds a context for a panic from its payload message and, when the
    /// hook fired, the snapshot it recorded.
    pub fn from_panic(message: impl Into<String>, snapshot: Option<crate::PanicSnapshot>) -> Self {
        match snapshot {
            Some(snap) => Self {
                kind: FailureKind::Panic,
                message: snap.message,
                location: snap.location,
                backtrace: Some(snap.backtrace),
                thread: snap.thread,
                values: Vec::new(),
                captured_at: Utc::now(),
            },
            None => Self {
                kind: FailureKind::Panic,
                message: message.into(),
                location: None,
                backtrace: Some(std::backtrace::Backtrace::force_capture().to_string()),
                thread: std::thread::current().name().map(str::to_string),
                values: Vec::new(),
                captured_at: Utc::now(),
            },
        }
    }

    /// Attaches a key/value annotation.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((key.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_location_displays_file_line_column() {
        let loc = SourceLocation {
            file: "src/main.rs".into(),
            line: 42,
            column: 7,
        };
        assert_eq!(loc.to_string(), "src/main.rs:42:7");
    }

    #[test]
    fn from_error_captures_message_and_backtrace() {
        let err = std::io::Error::other("disk on fire");
        let ctx = CrashContext::from_error(&err);
        assert_eq!(ctx.kind, FailureKind::Error);
        assert_eq!(ctx.message, "disk on fire");
        assert!(ctx.backtrace.is_some());
        assert!(ctx.location.is_none());
    }

    #[test]
    fn from_panic_without_snapshot_uses_payload_message() {
        let ctx = CrashContext::from_panic("boom", None);
        assert_eq!(ctx.kind, FailureKind::Panic);
        assert_eq!(ctx.message, "boom");
        assert!(ctx.backtrace.is_some());
    }

    #[test]
    fn with_value_accumulates_annotations() {
        let ctx = CrashContext::from_panic("boom", None)
            .with_value("user", "alice")
            .with_value("job", "sync-42");
        assert_eq!(ctx.values.len(), 2);
        assert_eq!(ctx.values[0], ("user".into(), "alice".into()));
    }

    #[test]
    fn failure_kind_display() {
        assert_eq!(FailureKind::Panic.to_string(), "panic");
        assert_eq!(FailureKind::Error.to_string(), "error");
    }
}
