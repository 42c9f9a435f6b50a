// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for crashrelay delivery channels.
//!
//! Channels use `#[async_trait]` for dynamic dispatch compatibility: the
//! controller holds them as `Arc<dyn ReportChannel>` in a fixed order.

pub mod channel;

pub use channel::ReportChannel;
