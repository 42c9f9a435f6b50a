// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable channel for deterministic testing.
//!
//! `ScriptedChannel` implements `ReportChannel` with a fixed outcome
//! script and captures every delivery attempt for assertion in tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crashrelay_core::error::CrashrelayError;
use crashrelay_core::traits::ReportChannel;
use crashrelay_core::types::{BacklogReceipt, Report, StoredReport};

/// Outcome script for a [`ScriptedChannel`].
#[derive(Debug, Clone)]
enum Script {
    /// Every attempt succeeds.
    AlwaysOk,
    /// Every attempt fails.
    AlwaysErr,
    /// The first `n` attempts fail, every later attempt succeeds.
    FailFirst(u32),
    /// Backlog attempts succeed but deliver only the listed ordinals;
    /// live attempts fail.
    PartialBacklog(Vec<u32>),
}

struct ScriptState {
    script: Script,
    attempts: u32,
}

/// A scriptable report channel for testing.
///
/// Captures two histories:
/// - **sent**: every report passed to `send_report`, successful or not
/// - **backlogs**: the ordinals offered to each `send_backlog` call
pub struct ScriptedChannel {
    name: &'static str,
    state: Mutex<ScriptState>,
    sent: Mutex<Vec<Report>>,
    backlogs: Mutex<Vec<Vec<u32>>>,
}

impl ScriptedChannel {
    fn with_script(name: &'static str, script: Script) -> Self {
        Self {
            name,
            state: Mutex::new(ScriptState {
                script,
                attempts: 0,
            }),
            sent: Mutex::new(Vec::new()),
            backlogs: Mutex::new(Vec::new()),
        }
    }

    /// A channel on which every attempt succeeds.
    pub fn always_ok(name: &'static str) -> Self {
        Self::with_script(name, Script::AlwaysOk)
    }

    /// A channel on which every attempt fails.
    pub fn always_err(name: &'static str) -> Self {
        Self::with_script(name, Script::AlwaysErr)
    }

    /// A channel that fails its first `failures` attempts and succeeds
    /// from then on. Live and backlog attempts share the counter.
    pub fn succeed_after(name: &'static str, failures: u32) -> Self {
        Self::with_script(name, Script::FailFirst(failures))
    }

    /// A channel whose backlog attempts deliver only the given ordinals.
    pub fn delivering_only(name: &'static str, ordinals: Vec<u32>) -> Self {
        Self::with_script(name, Script::PartialBacklog(ordinals))
    }

    /// Reports passed to `send_report`, in order, including failed attempts.
    pub async fn sent_reports(&self) -> Vec<Report> {
        self.sent.lock().await.clone()
    }

    /// Number of live delivery attempts observed.
    pub async fn live_attempts(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Number of backlog delivery attempts observed.
    pub async fn backlog_attempts(&self) -> usize {
        self.backlogs.lock().await.len()
    }

    /// Ordinals offered to each backlog attempt, in order.
    pub async fn offered_backlogs(&self) -> Vec<Vec<u32>> {
        self.backlogs.lock().await.clone()
    }

    /// Advances the attempt counter and reports whether this attempt
    /// succeeds under the script.
    async fn next_attempt_succeeds(&self) -> bool {
        let mut state = self.state.lock().await;
        state.attempts += 1;
        match &state.script {
            Script::AlwaysOk => true,
            Script::AlwaysErr => false,
            Script::FailFirst(failures) => state.attempts > *failures,
            Script::PartialBacklog(_) => false,
        }
    }

    fn scripted_failure(&self) -> CrashrelayError {
        CrashrelayError::Channel {
            message: format!("scripted failure on {}", self.name),
            source: None,
        }
    }
}

#[async_trait]
impl ReportChannel for ScriptedChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn send_report(&self, report: &Report) -> Result<(), CrashrelayError> {
        self.sent.lock().await.push(report.clone());
        if self.next_attempt_succeeds().await {
            Ok(())
        } else {
            Err(self.scripted_failure())
        }
    }

    async fn send_backlog(
        &self,
        reports: &[StoredReport],
    ) -> Result<BacklogReceipt, CrashrelayError> {
        let offered: Vec<u32> = reports.iter().map(|r| r.ordinal).collect();
        self.backlogs.lock().await.push(offered.clone());

        let partial = {
            let state = self.state.lock().await;
            match &state.script {
                Script::PartialBacklog(ordinals) => Some(ordinals.clone()),
                _ => None,
            }
        };

        if let Some(deliverable) = partial {
            let delivered = offered
                .into_iter()
                .filter(|ordinal| deliverable.contains(ordinal))
                .collect();
            return Ok(BacklogReceipt { delivered });
        }

        if self.next_attempt_succeeds().await {
            Ok(BacklogReceipt::covering(reports))
        } else {
            Err(self.scripted_failure())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(body: &str) -> Report {
        Report::new("Crash Report", body, false)
    }

    fn stored(ordinals: &[u32]) -> Vec<StoredReport> {
        ordinals
            .iter()
            .map(|&ordinal| StoredReport {
                ordinal,
                path: PathBuf::from(format!("/tmp/crashreport{ordinal:02}")),
            })
            .collect()
    }

    #[tokio::test]
    async fn always_ok_accepts_everything() {
        let channel = ScriptedChannel::always_ok("mail");
        assert!(channel.send_report(&report("r1")).await.is_ok());
        let receipt = channel.send_backlog(&stored(&[1, 2])).await.unwrap();
        assert_eq!(receipt.delivered, vec![1, 2]);
    }

    #[tokio::test]
    async fn always_err_rejects_everything() {
        let channel = ScriptedChannel::always_err("mail");
        assert!(channel.send_report(&report("r1")).await.is_err());
        assert!(channel.send_backlog(&stored(&[1])).await.is_err());
        assert_eq!(channel.live_attempts().await, 1);
        assert_eq!(channel.backlog_attempts().await, 1);
    }

    #[tokio::test]
    async fn succeed_after_flips_on_the_right_attempt() {
        let channel = ScriptedChannel::succeed_after("transfer", 2);
        assert!(channel.send_backlog(&stored(&[1])).await.is_err());
        assert!(channel.send_backlog(&stored(&[1])).await.is_err());
        assert!(channel.send_backlog(&stored(&[1])).await.is_ok());
        assert_eq!(channel.backlog_attempts().await, 3);
    }

    #[tokio::test]
    async fn send_report_captures_failed_attempts_too() {
        let channel = ScriptedChannel::always_err("mail");
        let _ = channel.send_report(&report("it broke")).await;
        let sent = channel.sent_reports().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "it broke");
    }

    #[tokio::test]
    async fn partial_backlog_delivers_only_listed_ordinals() {
        let channel = ScriptedChannel::delivering_only("transfer", vec![1, 3]);
        let receipt = channel.send_backlog(&stored(&[1, 2, 3])).await.unwrap();
        assert_eq!(receipt.delivered, vec![1, 3]);
        assert!(channel.send_report(&report("r1")).await.is_err());
    }

    #[tokio::test]
    async fn offered_backlogs_record_each_attempt() {
        let channel = ScriptedChannel::always_err("mail");
        let _ = channel.send_backlog(&stored(&[1, 2])).await;
        let _ = channel.send_backlog(&stored(&[1])).await;
        assert_eq!(
            channel.offered_backlogs().await,
            vec![vec![1, 2], vec![1]]
        );
    }
}
