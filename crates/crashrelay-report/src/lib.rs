// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure context capture and report rendering for crashrelay.
//!
//! [`CrashContext`] is the value object describing one failure; it is built
//! at the catch boundary from a panic (via the [`install_panic_capture`]
//! hook) or an error value. [`ReportRenderer`] turns a context into a
//! plain-text or HTML [`crashrelay_core::Report`] ready for delivery.

pub mod context;
pub mod hook;
pub mod render;

pub use context::{CrashContext, FailureKind, SourceLocation};
pub use hook::{install_panic_capture, take_panic_snapshot, PanicSnapshot};
pub use render::{escape_html, ReportRenderer};
