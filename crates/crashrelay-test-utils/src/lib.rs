// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for crashrelay integration tests.
//!
//! Provides a scriptable channel implementation for fast, deterministic,
//! CI-runnable tests without live mail or transfer services.

pub mod scripted_channel;

pub use scripted_channel::ScriptedChannel;
