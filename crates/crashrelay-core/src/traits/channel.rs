// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery channel trait for crash report transports (SMTP mail, FTP transfer).

use async_trait::async_trait;

use crate::error::CrashrelayError;
use crate::types::{BacklogReceipt, Report, StoredReport};

/// A transport that can deliver crash reports to an external destination.
///
/// Implementations return `Err` for connection, authentication, and protocol
/// failures; they must not panic on network errors. The caller owns the
/// channel boundary: every `Err` is logged and treated as a failed attempt,
/// so a broken channel can never take down the host program.
#[async_trait]
pub trait ReportChannel: Send + Sync {
    /// Short channel name used in logs ("mail", "transfer").
    fn name(&self) -> &str;

    /// Delivers a single just-captured report.
    async fn send_report(&self, report: &Report) -> Result<(), CrashrelayError>;

    /// Delivers the persisted backlog in one session.
    ///
    /// Returns the ordinals confirmed delivered. Channels that cannot fail
    /// partially report all-or-nothing; channels that upload per report keep
    /// going after an individual failure and report what made it through.
    async fn send_backlog(
        &self,
        reports: &[StoredReport],
    ) -> Result<BacklogReceipt, CrashrelayError>;
}
