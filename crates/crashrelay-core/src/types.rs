// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the report channels, store, and controller.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::CrashrelayError;

/// A formatted crash report, ready for delivery.
#[derive(Debug, Clone)]
pub struct Report {
    /// Short subject line for channels that carry one (mail).
    pub subject: String,
    /// Full report body: plain text, or an HTML document when `rich` is set.
    pub body: String,
    /// Whether `body` is rich HTML markup rather than plain text.
    pub rich: bool,
    /// Files to attach on live mail delivery. Ignored by bulk delivery.
    pub attachments: Vec<PathBuf>,
    /// When the underlying failure was captured.
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Creates a report with no attachments, stamped with the current time.
    pub fn new(subject: impl Into<String>, body: impl Into<String>, rich: bool) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            rich,
            attachments: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// A report persisted in the offline store.
///
/// Ordinal 1 is always the newest report; ordinals are contiguous up to the
/// store count. The content stays on disk until a delivery attempt needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReport {
    pub ordinal: u32,
    pub path: PathBuf,
}

impl StoredReport {
    /// Reads the persisted report body from disk.
    pub fn read(&self) -> Result<String, CrashrelayError> {
        std::fs::read_to_string(&self.path).map_err(|source| CrashrelayError::Store {
            message: format!("failed to read report {}", self.path.display()),
            source,
        })
    }
}

/// Per-report outcome of one bulk delivery session.
///
/// Holds the ordinals the channel confirmed delivered. A session-level
/// failure (connect, auth) is an `Err` from the channel instead, so an
/// empty receipt means the session worked but delivered nothing.
#[derive(Debug, Clone, Default)]
pub struct BacklogReceipt {
    pub delivered: Vec<u32>,
}

impl BacklogReceipt {
    /// A receipt confirming every listed report, for all-or-nothing channels.
    pub fn covering(reports: &[StoredReport]) -> Self {
        Self {
            delivered: reports.iter().map(|r| r.ordinal).collect(),
        }
    }

    /// A receipt confirming nothing.
    pub fn empty() -> Self {
        Self::default()
    }
}
