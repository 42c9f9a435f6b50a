// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the crashrelay reporting library.

use thiserror::Error;

/// The primary error type used across all crashrelay crates.
#[derive(Debug, Error)]
pub enum CrashrelayError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Report store errors (directory access, file rotation, purge failures).
    #[error("report store error: {message}: {source}")]
    Store {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Delivery channel errors (connection failure, authentication, protocol).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors (a panicked delivery task, poisoned state).
    #[error("internal error: {0}")]
    Internal(String),
}
