// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background retry of persisted crash reports.
//!
//! The watcher goes through states: Stopped -> Armed -> Running -> Stopped.
//! A single task wakes on a fixed interval, offers the whole backlog to every
//! channel, and purges the store once the union of the channels' receipts
//! covers every stored report.
//!
//! Stopping is cooperative: a stop request cancels a token that the task
//! checks between cycles, after the current sleep completes. An in-flight
//! delivery is never interrupted, so at most one more cycle finishes after a
//! stop request.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crashrelay_core::ReportChannel;
use crashrelay_store::ReportStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// States in the watcher FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// No retry task exists.
    Stopped,
    /// A retry task has been spawned but has not started its first cycle yet.
    Armed,
    /// The retry task is sleeping between cycles or delivering the backlog.
    Running,
}

impl std::fmt::Display for WatcherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatcherState::Stopped => write!(f, "stopped"),
            WatcherState::Armed => write!(f, "armed"),
            WatcherState::Running => write!(f, "running"),
        }
    }
}

/// Retries delivery of stored reports until every report has been accepted
/// by some channel, the store drains, or a stop is requested.
pub struct OfflineWatcher {
    store: Arc<ReportStore>,
    channels: Arc<Vec<Arc<dyn ReportChannel>>>,
    check_interval: Duration,
    state: Arc<Mutex<WatcherState>>,
    /// Token for the current task generation. Replaced on every start so the
    /// watcher can run again after a stop.
    token: Mutex<CancellationToken>,
}

impl OfflineWatcher {
    pub fn new(
        store: Arc<ReportStore>,
        channels: Vec<Arc<dyn ReportChannel>>,
        check_interval: Duration,
    ) -> Self {
        Self {
            store,
            channels: Arc::new(channels),
            check_interval,
            state: Arc::new(Mutex::new(WatcherState::Stopped)),
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> WatcherState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawns the retry task if it is not already active and the store holds
    /// at least one report. Safe to call repeatedly: only a Stopped watcher
    /// starts a new task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn ensure_running(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != WatcherState::Stopped {
            debug!(state = %*state, "offline watcher already active");
            return;
        }

        let reports = match self.store.list() {
            Ok(reports) => reports,
            Err(e) => {
                error!(error = %e, "failed to inspect the report store, watcher not started");
                return;
            }
        };
        if reports.is_empty() {
            debug!("no offline reports, watcher not needed");
            return;
        }

        let token = CancellationToken::new();
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = token.clone();
        *state = WatcherState::Armed;
        info!(
            count = reports.len(),
            interval_secs = self.check_interval.as_secs(),
            "starting offline report watcher"
        );

        let store = Arc::clone(&self.store);
        let channels = Arc::clone(&self.channels);
        let shared_state = Arc::clone(&self.state);
        let interval = self.check_interval;
        tokio::spawn(async move {
            *shared_state.lock().unwrap_or_else(|e| e.into_inner()) = WatcherState::Running;
            run_cycles(store, channels, interval, token).await;
            *shared_state.lock().unwrap_or_else(|e| e.into_inner()) = WatcherState::Stopped;
            info!("offline report watcher stopped");
        });
    }

    /// Asks the retry task to stop. The task observes the request between
    /// cycles; the state turns Stopped once it exits. A no-op when the
    /// watcher is already Stopped.
    pub fn request_stop(&self) {
        if self.state() == WatcherState::Stopped {
            return;
        }
        info!("stopping offline report watcher");
        self.token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
    }
}

/// One task generation: sleep, check for a stop request, then attempt the
/// whole backlog on every channel. Exits when the store is empty or every
/// stored report has been delivered and purged.
async fn run_cycles(
    store: Arc<ReportStore>,
    channels: Arc<Vec<Arc<dyn ReportChannel>>>,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        tokio::time::sleep(interval).await;

        if token.is_cancelled() {
            info!("offline watcher stop observed");
            break;
        }

        let reports = match store.list() {
            Ok(reports) => reports,
            Err(e) => {
                error!(error = %e, "failed to list offline reports");
                continue;
            }
        };
        if reports.is_empty() {
            info!("offline report backlog is empty");
            break;
        }

        debug!(count = reports.len(), "retrying delivery of offline reports");

        let mut delivered: HashSet<u32> = HashSet::new();
        for channel in channels.iter() {
            match channel.send_backlog(&reports).await {
                Ok(receipt) => {
                    delivered.extend(receipt.delivered.iter().copied());
                }
                Err(e) => {
                    error!(
                        channel = channel.name(),
                        error = %e,
                        "offline report delivery failed"
                    );
                }
            }
        }

        if reports.iter().all(|r| delivered.contains(&r.ordinal)) {
            match store.purge() {
                Ok(()) => {
                    info!(count = reports.len(), "offline reports delivered and purged");
                    break;
                }
                Err(e) => {
                    // The backlog stays in place and the next cycle re-sends it.
                    error!(error = %e, "failed to purge delivered reports");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crashrelay_test_utils::ScriptedChannel;
    use tempfile::tempdir;

    const INTERVAL: Duration = Duration::from_secs(300);

    fn store_with_reports(dir: &std::path::Path, bodies: &[&str]) -> Arc<ReportStore> {
        let store = Arc::new(ReportStore::new(dir, 10).unwrap());
        for body in bodies {
            store.save(body).unwrap();
        }
        store
    }

    fn watcher_over(store: &Arc<ReportStore>, channels: Vec<Arc<dyn ReportChannel>>) -> OfflineWatcher {
        OfflineWatcher::new(Arc::clone(store), channels, INTERVAL)
    }

    /// Advances paused time one interval at a time until the task exits.
    async fn wait_until_stopped(watcher: &OfflineWatcher) {
        for _ in 0..20 {
            if watcher.state() == WatcherState::Stopped {
                return;
            }
            tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        }
        panic!("watcher did not stop");
    }

    #[test]
    fn watcher_state_display() {
        assert_eq!(WatcherState::Stopped.to_string(), "stopped");
        assert_eq!(WatcherState::Armed.to_string(), "armed");
        assert_eq!(WatcherState::Running.to_string(), "running");
    }

    #[tokio::test]
    async fn empty_store_leaves_watcher_stopped() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &[]);
        let channel = Arc::new(ScriptedChannel::always_ok("mail"));
        let watcher = watcher_over(&store, vec![channel]);

        watcher.ensure_running();

        assert_eq!(watcher.state(), WatcherState::Stopped);
    }

    #[tokio::test]
    async fn stop_request_without_task_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &[]);
        let channel = Arc::new(ScriptedChannel::always_ok("mail"));
        let watcher = watcher_over(&store, vec![channel]);

        watcher.request_stop();

        assert_eq!(watcher.state(), WatcherState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn backlog_is_purged_after_first_successful_cycle() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &["first", "second"]);
        let channel = Arc::new(ScriptedChannel::always_ok("mail"));
        let watcher = watcher_over(&store, vec![channel.clone()]);

        watcher.ensure_running();
        assert_ne!(watcher.state(), WatcherState::Stopped);
        wait_until_stopped(&watcher).await;

        assert_eq!(channel.backlog_attempts().await, 1);
        assert_eq!(channel.offered_backlogs().await, vec![vec![1, 2]]);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_succeeds_only_after_scripted_failures() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &["stubborn"]);
        let channel = Arc::new(ScriptedChannel::succeed_after("mail", 2));
        let watcher = watcher_over(&store, vec![channel.clone()]);

        watcher.ensure_running();
        wait_until_stopped(&watcher).await;

        // Two failed cycles, then the third delivers and purges.
        assert_eq!(channel.backlog_attempts().await, 3);
        assert!(store.is_empty().unwrap());
        assert_eq!(watcher.state(), WatcherState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_running_spawns_a_single_task() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &["lonely"]);
        let channel = Arc::new(ScriptedChannel::always_err("mail"));
        let watcher = watcher_over(&store, vec![channel.clone()]);

        watcher.ensure_running();
        watcher.ensure_running();
        watcher.ensure_running();

        tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(1)).await;

        // Two cycles have elapsed; duplicate tasks would have doubled this.
        assert_eq!(channel.backlog_attempts().await, 2);

        watcher.request_stop();
        wait_until_stopped(&watcher).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_request_is_observed_between_cycles() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &["sticky"]);
        let channel = Arc::new(ScriptedChannel::always_err("mail"));
        let watcher = watcher_over(&store, vec![channel.clone()]);

        watcher.ensure_running();
        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(channel.backlog_attempts().await, 1);
        assert_eq!(watcher.state(), WatcherState::Running);

        watcher.request_stop();
        wait_until_stopped(&watcher).await;

        // The stop landed mid-sleep, so no further cycle ran.
        assert_eq!(channel.backlog_attempts().await, 1);
        assert!(!store.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn receipts_from_different_channels_combine() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &["first", "second"]);
        let mail = Arc::new(ScriptedChannel::delivering_only("mail", vec![1]));
        let transfer = Arc::new(ScriptedChannel::delivering_only("transfer", vec![2]));
        let watcher = watcher_over(&store, vec![mail.clone(), transfer.clone()]);

        watcher.ensure_running();
        wait_until_stopped(&watcher).await;

        // Neither channel delivered everything, but together they did.
        assert_eq!(mail.backlog_attempts().await, 1);
        assert_eq!(transfer.backlog_attempts().await, 1);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_receipts_keep_the_backlog() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &["first", "second"]);
        let channel = Arc::new(ScriptedChannel::delivering_only("mail", vec![1]));
        let watcher = watcher_over(&store, vec![channel.clone()]);

        watcher.ensure_running();
        tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(1)).await;

        assert_eq!(watcher.state(), WatcherState::Running);
        assert_eq!(store.count().unwrap(), 2);

        watcher.request_stop();
        wait_until_stopped(&watcher).await;
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_stops_when_store_drained_externally() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &["gone soon"]);
        let channel = Arc::new(ScriptedChannel::always_err("mail"));
        let watcher = watcher_over(&store, vec![channel.clone()]);

        watcher.ensure_running();
        store.purge().unwrap();
        wait_until_stopped(&watcher).await;

        assert_eq!(channel.backlog_attempts().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_can_restart_after_stop() {
        let dir = tempdir().unwrap();
        let store = store_with_reports(dir.path(), &["persistent"]);
        let channel = Arc::new(ScriptedChannel::succeed_after("mail", 1));
        let watcher = watcher_over(&store, vec![channel.clone()]);

        watcher.ensure_running();
        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(channel.backlog_attempts().await, 1);
        watcher.request_stop();
        wait_until_stopped(&watcher).await;
        assert_eq!(store.count().unwrap(), 1);

        // A fresh start gets a fresh token; the old cancellation does not stick.
        watcher.ensure_running();
        assert_ne!(watcher.state(), WatcherState::Stopped);
        wait_until_stopped(&watcher).await;

        assert_eq!(channel.backlog_attempts().await, 2);
        assert!(store.is_empty().unwrap());
    }
}
