// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Panic hook that records failure details at the panic site.
//!
//! Backtraces taken after unwinding point at the catch site, not the crash.
//! Installing this hook records the message, source location, thread, and a
//! backtrace while the stack is still intact; the monitored scope consumes
//! the snapshot when it catches the unwind. The previous hook is chained, so
//! default stderr output is preserved.

use std::sync::{Mutex, Once};

use crate::context::SourceLocation;

/// What the hook recorded for the most recent panic.
#[derive(Debug, Clone)]
pub struct PanicSnapshot {
    pub message: String,
    pub location: Option<SourceLocation>,
    pub thread: Option<String>,
    pub backtrace: String,
}

static LAST_PANIC: Mutex<Option<PanicSnapshot>> = Mutex::new(None);
static INSTALL: Once = Once::new();

/// Installs the capture hook, chaining any previously installed hook.
/// Safe to call more than once; only the first call installs.
pub fn install_panic_capture() {
    INSTALL.call_once(|| {
        let previous_hook = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |panic_info| {
            let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };

            let location = panic_info.location().map(|l| SourceLocation {
                file: l.file().to_string(),
                line: l.line(),
                column: l.column(),
            });

            let snapshot = PanicSnapshot {
                message,
                location,
                thread: std::thread::current().name().map(str::to_string),
                backtrace: std::backtrace::Backtrace::force_capture().to_string(),
            };

            *LAST_PANIC.lock().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);

            previous_hook(panic_info);
        }));
    });
}

/// Takes the snapshot of the most recent panic, if one fired since the last
/// take. Leaves the slot empty.
pub fn take_panic_snapshot() -> Option<PanicSnapshot> {
    LAST_PANIC.lock().unwrap_or_else(|e| e.into_inner()).take()
}
